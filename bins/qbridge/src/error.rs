use bridge_api::{BridgeError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum QbridgeError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("{0}")]
    Bridge(#[from] BridgeError),
}

impl QbridgeError {
    /// Process exit code, chosen by error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            QbridgeError::Config { .. } => 2,
            QbridgeError::Bridge(e) => match e.kind() {
                ErrorKind::Config | ErrorKind::Unsupported => 2,
                ErrorKind::Transport => 3,
                ErrorKind::Decode | ErrorKind::Conversion => 4,
                ErrorKind::Cancelled => 130,
            },
        }
    }
}
