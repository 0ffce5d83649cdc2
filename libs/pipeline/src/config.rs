use std::path::{Path, PathBuf};

use bridge_api::{BridgeError, DecodeRequest, EncodeRequest};

pub const DEFAULT_ADDRESS: &str = "amqp://localhost:5672";

// ═══════════════════════════════════════════════════════════════
//  Link
// ═══════════════════════════════════════════════════════════════

/// Broker address and queue shared by both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub address: String,
    pub queue: String,
    /// Queue (link terminus) should survive broker restarts.
    pub durable: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            queue: String::new(),
            durable: false,
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.address.trim().is_empty() {
            return Err(BridgeError::config("address cannot be empty"));
        }
        if self.queue.trim().is_empty() {
            return Err(BridgeError::config("queue cannot be empty"));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schema source
// ═══════════════════════════════════════════════════════════════

/// Where to resolve the schema handle from. Both parts are required together,
/// and only when a schema-axis type is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaConfig {
    /// Descriptor set file or directory of descriptor sets.
    pub location: Option<PathBuf>,
    /// Root message type name.
    pub root_message: Option<String>,
}

impl SchemaConfig {
    pub fn validate(&self, required: bool) -> Result<(), BridgeError> {
        if !required {
            return Ok(());
        }
        let location = self
            .location
            .as_deref()
            .ok_or_else(|| BridgeError::config("protobuf dir must be set when type is set to 'protobuf'"))?;
        if self.root_message.as_deref().is_none_or(|r| r.trim().is_empty()) {
            return Err(BridgeError::config(
                "protobuf root message must be set when type is set to 'protobuf'",
            ));
        }
        if !location.exists() {
            return Err(BridgeError::config(format!(
                "protobuf dir '{}' does not exist",
                location.display()
            )));
        }
        Ok(())
    }

    /// `(location, root message)` when both are present.
    pub fn source(&self) -> Option<(&Path, &str)> {
        match (&self.location, &self.root_message) {
            (Some(location), Some(root)) => Some((location.as_path(), root.as_str())),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Produce source data
// ═══════════════════════════════════════════════════════════════

/// Inline value or file path; exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSource {
    pub data: Option<String>,
    pub file: Option<PathBuf>,
}

impl InputSource {
    pub fn inline(data: impl Into<String>) -> Self {
        Self { data: Some(data.into()), file: None }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { data: None, file: Some(path.into()) }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        match (&self.data, &self.file) {
            (Some(_), Some(_)) => Err(BridgeError::config(
                "input data and input file cannot both be set (choose one!)",
            )),
            (None, None) => Err(BridgeError::config("either input data or input file must be set")),
            (None, Some(path)) if !path.is_file() => Err(BridgeError::config(format!(
                "input file '{}' does not exist",
                path.display()
            ))),
            _ => Ok(()),
        }
    }

    /// Validate, then read the whole source into memory.
    pub fn load(&self) -> Result<Vec<u8>, BridgeError> {
        self.validate()?;
        if let Some(path) = &self.file {
            return std::fs::read(path).map_err(|e| {
                BridgeError::config(format!("unable to read file '{}': {e}", path.display()))
            });
        }
        Ok(self.data.clone().unwrap_or_default().into_bytes())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Read / Write
// ═══════════════════════════════════════════════════════════════

/// Consume-side options after merging config file and CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadConfig {
    pub link: LinkConfig,
    /// Ask the broker for an exclusive consumer.
    pub exclusive: bool,
    /// Keep consuming until cancelled (`tail -f`).
    pub follow: bool,
    /// Prefix each emitted line with a 1-based counter.
    pub line_numbers: bool,
    pub schema: SchemaConfig,
    pub decode: DecodeRequest,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            exclusive: true,
            follow: false,
            line_numbers: false,
            schema: SchemaConfig::default(),
            decode: DecodeRequest::default(),
        }
    }
}

impl ReadConfig {
    pub fn validate(&self) -> Result<(), BridgeError> {
        self.link.validate()?;
        self.schema.validate(self.decode.wire.needs_schema())
    }

    pub fn needs_schema(&self) -> bool {
        self.decode.wire.needs_schema()
    }
}

/// Produce-side options after merging config file and CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteConfig {
    pub link: LinkConfig,
    pub input: InputSource,
    pub schema: SchemaConfig,
    pub encode: EncodeRequest,
}

impl WriteConfig {
    pub fn validate(&self) -> Result<(), BridgeError> {
        self.link.validate()?;
        self.schema.validate(self.needs_schema())?;
        self.input.validate()
    }

    /// Only a schema-typed output needs the schema flags. A schema-typed input
    /// paired with a plain output is left for `EncodePipeline::new` to reject.
    pub fn needs_schema(&self) -> bool {
        self.encode.output.needs_schema()
    }
}

#[cfg(test)]
mod tests {
    use bridge_api::{ErrorKind, SchemaEncoding};

    use super::*;

    fn link() -> LinkConfig {
        LinkConfig { queue: "events".into(), ..Default::default() }
    }

    #[test]
    fn empty_queue_is_rejected() {
        let err = LinkConfig::default().validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.message(), "queue cannot be empty");
    }

    #[test]
    fn empty_address_is_rejected() {
        let cfg = LinkConfig { address: " ".into(), ..link() };
        assert_eq!(cfg.validate().unwrap_err().message(), "address cannot be empty");
    }

    #[test]
    fn plain_read_needs_no_schema() {
        let cfg = ReadConfig { link: link(), ..Default::default() };
        cfg.validate().unwrap();
        assert!(cfg.exclusive);
    }

    #[test]
    fn protobuf_read_requires_both_schema_parts() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = ReadConfig { link: link(), ..Default::default() };
        cfg.decode.wire = SchemaEncoding::Binary;
        assert_eq!(cfg.validate().unwrap_err().kind(), ErrorKind::Config);

        cfg.schema.location = Some(dir.path().to_path_buf());
        assert!(cfg.validate().unwrap_err().message().contains("root message"));

        cfg.schema.root_message = Some("events.Event".into());
        cfg.validate().unwrap();
        assert_eq!(cfg.schema.source(), Some((dir.path(), "events.Event")));
    }

    #[test]
    fn missing_schema_location_is_rejected() {
        let cfg = SchemaConfig {
            location: Some("/no/such/dir".into()),
            root_message: Some("events.Event".into()),
        };
        assert!(cfg.validate(true).unwrap_err().message().contains("does not exist"));
        cfg.validate(false).unwrap();
    }

    #[test]
    fn both_inputs_are_rejected() {
        let input = InputSource { data: Some("x".into()), file: Some("/tmp/x".into()) };
        let err = input.load().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.message().contains("cannot both be set"));
    }

    #[test]
    fn no_input_is_rejected() {
        assert_eq!(InputSource::default().validate().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_input_file_is_rejected() {
        let err = InputSource::file("/no/such/file.json").validate().unwrap_err();
        assert!(err.message().contains("does not exist"));
    }

    #[test]
    fn input_file_is_read_fully() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msg.json");
        std::fs::write(&path, b"{\"id\":1}\n").unwrap();
        assert_eq!(InputSource::file(&path).load().unwrap(), b"{\"id\":1}\n");
        assert_eq!(InputSource::inline("hi").load().unwrap(), b"hi");
    }

    #[test]
    fn jsonpb_write_requires_schema() {
        let mut cfg = WriteConfig { link: link(), input: InputSource::inline("{}"), ..Default::default() };
        cfg.validate().unwrap();
        cfg.encode.input_schema = SchemaEncoding::Text;
        cfg.encode.output = SchemaEncoding::Binary;
        assert_eq!(cfg.validate().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn jsonpb_to_plain_is_unsupported_not_a_config_error() {
        let cfg = WriteConfig {
            link: link(),
            input: InputSource::inline("{}"),
            schema: SchemaConfig::default(),
            encode: EncodeRequest {
                input_schema: SchemaEncoding::Text,
                output: SchemaEncoding::Raw,
                ..Default::default()
            },
        };
        assert!(!cfg.needs_schema());
        cfg.validate().unwrap();

        let err = crate::EncodePipeline::new(cfg.encode, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(err.message().contains("jsonpb → plain"));
    }
}
