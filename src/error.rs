//! Error types for Synheart Hypnogram

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Malformed input row {row}: {reason}")]
    MalformedInput { row: usize, reason: String },

    #[error("Empty input: at least one sample is required")]
    EmptyInput,

    #[error("Degenerate series of {samples} sample(s): portion of night is undefined")]
    DivisionDegenerate { samples: usize },

    #[error("Inconsistent stage data for {stage}: {reason}")]
    InconsistentStageData { stage: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse rows: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl ComputeError {
    pub(crate) fn malformed(row: usize, reason: impl Into<String>) -> Self {
        ComputeError::MalformedInput {
            row,
            reason: reason.into(),
        }
    }
}
