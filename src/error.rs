use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapkeepError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unable to create storage directory {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl SnapkeepError {
    /// Create a configuration error with a custom message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (other files can still be processed)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SnapkeepError::Io(_))
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SnapkeepError::Interrupted => 130,
            SnapkeepError::Config { .. } => 2,
            _ => 1,
        }
    }
}
