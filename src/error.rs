use thiserror::Error;

/// Errors surfaced by the application layer.
///
/// The removal engine never returns these: per-target failures are captured
/// into `TargetOutcome`s and the run summary instead.
#[derive(Error, Debug)]
pub enum ForceRmError {
    #[error("No directories selected")]
    EmptyBatch,

    #[error("Invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("User cancelled")]
    UserCancelled,

    #[error("Removal worker stopped unexpectedly: {0}")]
    WorkerFailed(String),

    #[error("Log file error: {0}")]
    LogFileError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForceRmError>;
