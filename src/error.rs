use thiserror::Error as ThisError;

/// Errors that can occur in the logging engine
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Initialization failed.
    #[error("Initialization error: {0}")]
    Init(String),
    /// Timestamp could not be formatted.
    #[error("Time error: {0}")]
    Time(#[from] time::error::Format),
    /// A record could not be serialized to JSON.
    #[error("Render error: {0}")]
    Render(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
