use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Backend returned HTTP {status}")]
    Status { status: u16 },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BackendError {
    /// HTTP status of a reply the backend did send, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}
