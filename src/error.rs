// src/error.rs
//
// Error types shared by feature extraction, model construction and
// persistence. Numerical degeneracies are clamped, not reported here.

use thiserror::Error;

/// Errors raised by the extraction and classification core
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Malformed construction arguments (empty signals, mismatched lengths, bad options)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Feature shape differs from what a consumer was configured for
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Merge attempted across models built from different configurations
    #[error("incompatible models: {0}")]
    IncompatibleModels(String),

    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("audio decoding failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ClassifierError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let err = ClassifierError::mismatch("normalizer position 2", 13, 26);
        assert_eq!(
            err.to_string(),
            "dimension mismatch in normalizer position 2: expected 13, got 26"
        );
    }
}
