use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network unreachable, timed out or connection dropped mid-request
    #[error("Connection error: {0}")]
    Connection(String),

    /// The engine answered with a non-2xx status
    #[error("Engine error: {status} - {body}")]
    Engine { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timed out after {0:?} waiting for a pooled connection")]
    PoolTimeout(Duration),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response from engine: {0}")]
    InvalidResponse(String),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),
}

impl Error {
    /// Whether a retrying transport may attempt the call again
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
