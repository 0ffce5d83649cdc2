use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use bridge_api::{ByteEncoding, DecodeRequest, EncodeRequest, SchemaEncoding};
use pipeline::config::{InputSource, LinkConfig, ReadConfig, SchemaConfig, WriteConfig, DEFAULT_ADDRESS};

use crate::error::QbridgeError;

#[derive(Parser)]
#[command(name = "qbridge", about = "Inspect or inject messages on an AMQP 1.0 queue")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Consume message(s) from a queue and print them
    Read(ReadArgs),
    /// Send one message to a queue
    Write(WriteArgs),
}

// ═══════════════════════════════════════════════════════════════
//  Wire types as they appear on the command line / in TOML
// ═══════════════════════════════════════════════════════════════

/// Type of the messages received on the bus.
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadType {
    Plain,
    Protobuf,
}

/// Conversion applied to received messages.
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Convert {
    Base64,
    Gzip,
}

/// How the write input should be treated.
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Plain,
    Base64,
    Jsonpb,
}

/// Type put on the wire by `write`.
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteType {
    Plain,
    Protobuf,
}

impl From<ReadType> for SchemaEncoding {
    fn from(t: ReadType) -> Self {
        match t {
            ReadType::Plain => SchemaEncoding::Raw,
            ReadType::Protobuf => SchemaEncoding::Binary,
        }
    }
}

impl From<WriteType> for SchemaEncoding {
    fn from(t: WriteType) -> Self {
        match t {
            WriteType::Plain => SchemaEncoding::Raw,
            WriteType::Protobuf => SchemaEncoding::Binary,
        }
    }
}

impl From<Convert> for ByteEncoding {
    fn from(c: Convert) -> Self {
        match c {
            Convert::Base64 => ByteEncoding::Base64,
            Convert::Gzip => ByteEncoding::Gzip,
        }
    }
}

impl InputType {
    fn axes(self) -> (ByteEncoding, SchemaEncoding) {
        match self {
            InputType::Plain => (ByteEncoding::Raw, SchemaEncoding::Raw),
            InputType::Base64 => (ByteEncoding::Base64, SchemaEncoding::Raw),
            InputType::Jsonpb => (ByteEncoding::Raw, SchemaEncoding::Text),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub address: Option<String>,
    pub queue: Option<String>,
    pub queue_durable: Option<bool>,
    #[serde(default)]
    pub read: ReadSection,
    #[serde(default)]
    pub write: WriteSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadSection {
    pub queue_exclusive: Option<bool>,
    pub line_numbers: Option<bool>,
    pub follow: Option<bool>,
    pub protobuf_dir: Option<PathBuf>,
    pub protobuf_root_message: Option<String>,
    pub output_type: Option<ReadType>,
    pub convert: Option<Convert>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteSection {
    pub input_data: Option<String>,
    pub input_file: Option<PathBuf>,
    pub input_type: Option<InputType>,
    pub output_type: Option<WriteType>,
    pub protobuf_dir: Option<PathBuf>,
    pub protobuf_root_message: Option<String>,
}

pub fn load_config(path: &str) -> Result<FileConfig, QbridgeError> {
    let content = std::fs::read_to_string(path).map_err(|e| QbridgeError::Config {
        context: "read",
        detail: format!("'{path}': {e}"),
    })?;
    toml::from_str(&content).map_err(|e| QbridgeError::Config {
        context: "parse",
        detail: format!("'{path}': {e}"),
    })
}

/// A missing config file is fine; one that exists but fails to parse is not.
fn load_optional(path: &str) -> Result<FileConfig, QbridgeError> {
    match load_config(path) {
        Ok(cfg) => {
            tracing::debug!(config = %path, "loaded config file");
            Ok(cfg)
        }
        Err(e) if Path::new(path).exists() => Err(e),
        Err(_) => Ok(FileConfig::default()),
    }
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct SharedArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "qbridge.toml", env = "QBRIDGE_CONFIG")]
    pub config: String,

    /// Destination host address
    #[arg(long)]
    pub address: Option<String>,

    /// Name of the queue
    #[arg(long)]
    pub queue: Option<String>,

    /// Whether the queue we declare should survive server restarts
    #[arg(long)]
    pub queue_durable: bool,

    /// Directory with .proto sources and/or descriptor sets (or a single such file)
    #[arg(long)]
    pub protobuf_dir: Option<PathBuf>,

    /// Root message name (required if protobuf-dir is set)
    #[arg(long)]
    pub protobuf_root_message: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub shared: SharedArgs,

    /// Whether we should be the only consumer of the queue [default: true]
    #[arg(long, action = ArgAction::Set)]
    pub queue_exclusive: Option<bool>,

    /// Display line numbers for each message
    #[arg(long)]
    pub line_numbers: bool,

    /// Continuous read (ie. `tail -f`)
    #[arg(short, long)]
    pub follow: bool,

    /// The type of message(s) you will receive on the bus [default: plain]
    #[arg(long, value_enum)]
    pub output_type: Option<ReadType>,

    /// Convert received (output) message(s)
    #[arg(long, value_enum)]
    pub convert: Option<Convert>,
}

#[derive(Args, Clone, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    pub shared: SharedArgs,

    /// Data to write
    #[arg(long)]
    pub input_data: Option<String>,

    /// File containing input data (1 file is 1 message)
    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// Treat input as this type [default: plain]
    #[arg(long, value_enum)]
    pub input_type: Option<InputType>,

    /// Convert input to this type when writing message [default: plain]
    #[arg(long, value_enum)]
    pub output_type: Option<WriteType>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config (config file < CLI)
// ═══════════════════════════════════════════════════════════════

fn link(shared: &SharedArgs, file: &FileConfig) -> LinkConfig {
    LinkConfig {
        address: shared
            .address
            .clone()
            .or_else(|| file.address.clone())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
        queue: shared.queue.clone().or_else(|| file.queue.clone()).unwrap_or_default(),
        durable: shared.queue_durable || file.queue_durable.unwrap_or(false),
    }
}

impl ReadArgs {
    pub fn effective(&self) -> Result<ReadConfig, QbridgeError> {
        let file = load_optional(&self.shared.config)?;
        Ok(self.merge(&file))
    }

    fn merge(&self, file: &FileConfig) -> ReadConfig {
        let section = &file.read;
        let wire = self.output_type.or(section.output_type).unwrap_or(ReadType::Plain);
        let convert = self
            .convert
            .or(section.convert)
            .map(ByteEncoding::from)
            .unwrap_or_default();

        ReadConfig {
            link: link(&self.shared, file),
            exclusive: self.queue_exclusive.or(section.queue_exclusive).unwrap_or(true),
            follow: self.follow || section.follow.unwrap_or(false),
            line_numbers: self.line_numbers || section.line_numbers.unwrap_or(false),
            schema: SchemaConfig {
                location: self.shared.protobuf_dir.clone().or_else(|| section.protobuf_dir.clone()),
                root_message: self
                    .shared
                    .protobuf_root_message
                    .clone()
                    .or_else(|| section.protobuf_root_message.clone()),
            },
            decode: DecodeRequest { wire: wire.into(), convert },
        }
    }
}

impl WriteArgs {
    pub fn effective(&self) -> Result<WriteConfig, QbridgeError> {
        let file = load_optional(&self.shared.config)?;
        Ok(self.merge(&file))
    }

    fn merge(&self, file: &FileConfig) -> WriteConfig {
        let section = &file.write;
        let (input_bytes, input_schema) = self
            .input_type
            .or(section.input_type)
            .unwrap_or(InputType::Plain)
            .axes();
        let output = self.output_type.or(section.output_type).unwrap_or(WriteType::Plain);

        // CLI wins over the file as a pair: an inline value on the command
        // line must not collide with an input file from the config.
        let input = if self.input_data.is_some() || self.input_file.is_some() {
            InputSource { data: self.input_data.clone(), file: self.input_file.clone() }
        } else {
            InputSource { data: section.input_data.clone(), file: section.input_file.clone() }
        };

        WriteConfig {
            link: link(&self.shared, file),
            input,
            schema: SchemaConfig {
                location: self.shared.protobuf_dir.clone().or_else(|| section.protobuf_dir.clone()),
                root_message: self
                    .shared
                    .protobuf_root_message
                    .clone()
                    .or_else(|| section.protobuf_root_message.clone()),
            },
            encode: EncodeRequest { input_bytes, input_schema, output: output.into() },
        }
    }
}
