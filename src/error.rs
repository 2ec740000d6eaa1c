use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlackboxError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Bad status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The service answered with `Success: false`; the message is passed through untouched.
    #[error("{0}")]
    Remote(String),

    #[error("Attached reader dropped before EOF after {bytes_read} bytes, nothing uploaded")]
    AttachAbandoned { bytes_read: usize },

    #[error("Upload task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BlackboxError>;

impl BlackboxError {
    /// Error reported by the service itself in a well-formed envelope.
    pub fn is_remote(&self) -> bool {
        matches!(self, BlackboxError::Remote(_))
    }

    /// Network failure, non-OK status, unreadable body or undecodable JSON.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BlackboxError::Network(_)
                | BlackboxError::Status { .. }
                | BlackboxError::InvalidResponse(_)
                | BlackboxError::Io(_)
        )
    }
}

impl From<serde_json::Error> for BlackboxError {
    fn from(err: serde_json::Error) -> Self {
        BlackboxError::InvalidResponse(err.to_string())
    }
}
