use std::future::Future;
use std::io::Write;
use std::pin::Pin;

mod error;

pub use error::{BridgeError, ErrorKind};

/// Boxed future returned by the async trait methods below.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ════════════════════════════════════════════════════════════════
//  Conversion axes
// ════════════════════════════════════════════════════════════════

/// Byte axis: transformation applied to raw bytes, independent of any schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteEncoding {
    #[default]
    Raw,
    Base64,
    Gzip,
}

impl std::fmt::Display for ByteEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteEncoding::Raw => f.write_str("raw"),
            ByteEncoding::Base64 => f.write_str("base64"),
            ByteEncoding::Gzip => f.write_str("gzip"),
        }
    }
}

/// Schema axis: how the payload relates to the resolved message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchemaEncoding {
    /// Opaque bytes, no schema involved.
    #[default]
    Raw,
    /// Schema-binary wire encoding (protobuf).
    Binary,
    /// Human-readable structured text (protobuf JSON mapping).
    Text,
}

impl SchemaEncoding {
    /// Whether this encoding can only be interpreted with a schema handle.
    pub fn needs_schema(self) -> bool {
        !matches!(self, SchemaEncoding::Raw)
    }
}

impl std::fmt::Display for SchemaEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaEncoding::Raw => f.write_str("plain"),
            SchemaEncoding::Binary => f.write_str("protobuf"),
            SchemaEncoding::Text => f.write_str("jsonpb"),
        }
    }
}

/// What the consume side does with each body.
///
/// Selected once from configuration; immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeRequest {
    /// `Raw` or `Binary`. `Binary` bodies are decoded to structured text first.
    pub wire: SchemaEncoding,
    /// Byte transform applied after the schema stage.
    pub convert: ByteEncoding,
}

/// What the produce side does with the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeRequest {
    /// Byte-axis encoding of the source data.
    pub input_bytes: ByteEncoding,
    /// Schema-axis encoding of the source data.
    pub input_schema: SchemaEncoding,
    /// Schema-axis encoding put on the wire.
    pub output: SchemaEncoding,
}

// ════════════════════════════════════════════════════════════════
//  Message envelope
// ════════════════════════════════════════════════════════════════

/// One message pulled off the transport. Owned by a single loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport-local id; `ack` must be called with the same delivery.
    pub id: u64,
    pub body: Vec<u8>,
}

// ════════════════════════════════════════════════════════════════
//  Plugin traits
// ════════════════════════════════════════════════════════════════

/// Broker-specific link providing the receive/ack/send primitives.
///
/// Connection, session and link negotiation happen before a `Transport`
/// is handed to the core. Errors are opaque and always fatal.
pub trait Transport: Send {
    /// Block until one message is available.
    fn receive(&mut self) -> BoxFuture<'_, Result<Delivery, BridgeError>>;

    /// Acknowledge a previously received delivery.
    fn ack<'a>(&'a mut self, delivery: &'a Delivery) -> BoxFuture<'a, Result<(), BridgeError>>;

    /// Send one message body.
    fn send(&mut self, body: Vec<u8>) -> BoxFuture<'_, Result<(), BridgeError>>;

    /// Detach and release the underlying link.
    fn close(&mut self) -> BoxFuture<'_, Result<(), BridgeError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Resolved, read-only description of one named structured-message type.
///
/// The only two operations the pipeline needs; all runtime typing stays
/// behind them.
pub trait MessageSchema: Send + Sync {
    /// Fully-qualified type name.
    fn name(&self) -> &str;

    /// Schema-binary bytes → structured text.
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, BridgeError>;

    /// Structured text → schema-binary bytes.
    fn encode(&self, text: &[u8]) -> Result<Vec<u8>, BridgeError>;
}

/// Stateless byte → byte transform (identity, base64, gzip).
///
/// `decode` undoes the encoding (consume side), `encode` applies it.
pub trait Middleware: Send + Sync {
    fn decode(&self, data: Vec<u8>) -> Result<Vec<u8>, BridgeError>;

    fn encode(&self, data: Vec<u8>) -> Result<Vec<u8>, BridgeError>;
}

/// Where converted messages go. Infallible from the core's point of view.
///
/// Lines are raw bytes: a converted body is not required to be UTF-8.
pub trait OutputSink {
    fn emit(&mut self, line: &[u8]);
}

/// Where skipped per-message failures are reported in follow mode.
pub trait ErrorSink {
    fn report(&mut self, message: &str);
}

// ════════════════════════════════════════════════════════════════
//  Built-in sinks
// ════════════════════════════════════════════════════════════════

/// Writes each line to stdout unchanged, followed by a newline.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, line: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        let written = stdout
            .write_all(line)
            .and_then(|()| stdout.write_all(b"\n"))
            .and_then(|()| stdout.flush());
        if let Err(e) = written {
            tracing::debug!(error = %e, "stdout write failed");
        }
    }
}

/// Prints each report to stderr and mirrors it into the log.
#[derive(Debug, Default)]
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn report(&mut self, message: &str) {
        tracing::warn!(error = %message, "message skipped");
        eprintln!("ERROR: {message}");
    }
}

/// Collects lines in memory, byte for byte.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub lines: Vec<Vec<u8>>,
}

impl MemorySink {
    /// Collected lines as text, lossy on invalid UTF-8.
    pub fn text(&self) -> Vec<String> {
        self.lines.iter().map(|l| String::from_utf8_lossy(l).into_owned()).collect()
    }
}

impl OutputSink for MemorySink {
    fn emit(&mut self, line: &[u8]) {
        self.lines.push(line.to_vec());
    }
}

impl ErrorSink for MemorySink {
    fn report(&mut self, message: &str) {
        self.lines.push(message.as_bytes().to_vec());
    }
}
