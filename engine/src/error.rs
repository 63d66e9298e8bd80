//! Error types for the outbox engine.

use crate::MutationId;
use thiserror::Error;

/// All possible errors from the outbox engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Persisted state errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("unsupported snapshot format version: {found} (max supported: {supported})")]
    UnsupportedFormatVersion { found: u32, supported: u32 },

    // Queue errors
    #[error("mutation not found: {0}")]
    MutationNotFound(MutationId),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::MutationNotFound("m-1".into());
        assert_eq!(err.to_string(), "mutation not found: m-1");

        let err = Error::UnsupportedFormatVersion {
            found: 9,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported snapshot format version: 9 (max supported: 1)"
        );

        let err = Error::InvalidSnapshot("expected value at line 1".into());
        assert_eq!(
            err.to_string(),
            "invalid snapshot: expected value at line 1"
        );
    }
}
