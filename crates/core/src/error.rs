use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("time index is not strictly increasing at position {position}")]
    NonMonotonicIndex { position: usize },

    #[error("no fixed sampling frequency deducible from the time index")]
    MissingFrequency,

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("column '{column}' has {actual} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
