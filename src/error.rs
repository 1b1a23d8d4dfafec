//! Error taxonomy for the capture engine.
//!
//! Configuration and oversized-input failures are unrecoverable and always
//! propagate. Ambiguous header structure and ragged rows are recoverable by
//! default and only surface here under strict policies; otherwise they are
//! reported as [`CaptureWarning`](crate::capture::CaptureWarning) values.

use thiserror::Error;

/// Remediation attached to [`CaptureError::InputTooLarge`].
pub const OVERSIZED_INPUT_HINT: &str =
    "split the document into smaller files or convert it to a plain delimited format (CSV/TSV)";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid capture configuration: {0}")]
    Configuration(String),

    #[error("Input of {size} bytes exceeds the maximum supported text length of {limit} bytes; {hint}")]
    InputTooLarge {
        size: u64,
        limit: u64,
        hint: &'static str,
    },

    #[error("Failed to decode input: {0}")]
    DecodeFailed(String),

    #[error("No header-like row found within the first {searched} row(s)")]
    AmbiguousStructure { searched: usize },

    #[error("Row {row} has {actual} cell(s) but the header defines {expected} column(s)")]
    RowShapeMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Sheet already exists in workbook: {name}")]
    DuplicateSheet { name: String },
}

impl CaptureError {
    pub fn config(message: impl Into<String>) -> Self {
        CaptureError::Configuration(message.into())
    }

    pub fn too_large(size: u64, limit: u64) -> Self {
        CaptureError::InputTooLarge {
            size,
            limit,
            hint: OVERSIZED_INPUT_HINT,
        }
    }

    /// True for the conditions callers must surface as blocking failures.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::Configuration(_)
                | CaptureError::InputTooLarge { .. }
                | CaptureError::DecodeFailed(_)
        )
    }
}

impl From<csv::Error> for CaptureError {
    fn from(err: csv::Error) -> Self {
        CaptureError::DecodeFailed(err.to_string())
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::DecodeFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
