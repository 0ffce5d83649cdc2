/// Category of a bridge error. The consume loop and the binary branch on it:
/// only `Decode`/`Conversion` may be skipped, everything else aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid, missing or conflicting options. Detected before any I/O.
    Config,
    /// Receive/ack/send failure. Always fatal, never retried.
    Transport,
    /// Payload is not a valid schema-binary instance of the resolved type.
    Decode,
    /// Byte transform or structured-text parse failed.
    Conversion,
    /// Requested input/output pair has no defined conversion.
    Unsupported,
    /// The caller's cancellation token fired during a blocking call.
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Transport => f.write_str("transport"),
            ErrorKind::Decode => f.write_str("decode"),
            ErrorKind::Conversion => f.write_str("conversion"),
            ErrorKind::Unsupported => f.write_str("unsupported"),
            ErrorKind::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Unified error type for every stage of the bridge.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
/// Stages pick the kind explicitly through the constructors below.
#[derive(Clone, PartialEq, Eq)]
pub struct BridgeError {
    kind: ErrorKind,
    message: String,
}

impl BridgeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Transport, message: msg.into() }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Decode, message: msg.into() }
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Conversion, message: msg.into() }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Unsupported, message: msg.into() }
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Cancelled, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Per-message payload failure: follow mode reports it and moves on.
    pub fn is_skippable(&self) -> bool {
        matches!(self.kind, ErrorKind::Decode | ErrorKind::Conversion)
    }

    /// Prefix the message with context, keeping the kind.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        Self { kind: self.kind, message: format!("{ctx}: {}", self.message) }
    }
}

impl std::fmt::Debug for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BridgeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_payload_errors_are_skippable() {
        assert!(BridgeError::decode("bad").is_skippable());
        assert!(BridgeError::conversion("bad").is_skippable());
        assert!(!BridgeError::config("bad").is_skippable());
        assert!(!BridgeError::transport("bad").is_skippable());
        assert!(!BridgeError::unsupported("bad").is_skippable());
        assert!(!BridgeError::cancelled("bad").is_skippable());
    }

    #[test]
    fn context_keeps_kind() {
        let e = BridgeError::decode("unexpected EOF").context("unable to decode protobuf message");
        assert_eq!(e.kind(), ErrorKind::Decode);
        assert_eq!(e.to_string(), "unable to decode protobuf message: unexpected EOF");
        assert_eq!(format!("{e:?}"), "[decode] unable to decode protobuf message: unexpected EOF");
    }
}
