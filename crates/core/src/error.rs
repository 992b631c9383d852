//! Error types for stratavec
//!
//! Every fallible operation in the workspace returns [`VectorResult`]. The
//! variants map one-to-one onto the failure classes callers need to tell
//! apart: bad input, allocation failure, an operation that no longer applies,
//! an index builder failure, a bad configuration, or a migration that ended
//! in something other than success.

use thiserror::Error;

use crate::types::MigrationStatus;

/// Result type alias for vector operations
pub type VectorResult<T> = std::result::Result<T, VectorError>;

/// Errors raised by the vector collection core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VectorError {
    /// Input failed validation (empty vector, short buffer, zero output capacity)
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the input
        message: String,
    },

    /// Two operands had different logical dimensions
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        got: usize,
    },

    /// A fallible reservation failed
    #[error("out of memory: {context}")]
    OutOfMemory {
        /// Which allocation failed
        context: String,
    },

    /// The operation does not apply in the current state
    ///
    /// Returned by `cancel` on a migration that already reached a terminal status.
    #[error("not applicable: {message}")]
    NotApplicable {
        /// Why the operation does not apply
        message: String,
    },

    /// An index builder rejected a vector or failed to finish
    #[error("index build failed: {message}")]
    BuildFailed {
        /// Builder-provided reason
        message: String,
    },

    /// Configuration could not be read, parsed, or validated
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// A migration reached a terminal status other than COMPLETED
    #[error("migration ended with status {status}")]
    MigrationEnded {
        /// Terminal status of the migration
        status: MigrationStatus,
    },
}

impl VectorError {
    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        VectorError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an OutOfMemory error
    pub fn out_of_memory(context: impl Into<String>) -> Self {
        VectorError::OutOfMemory {
            context: context.into(),
        }
    }

    /// Create a NotApplicable error
    pub fn not_applicable(message: impl Into<String>) -> Self {
        VectorError::NotApplicable {
            message: message.into(),
        }
    }

    /// Create a BuildFailed error
    pub fn build_failed(message: impl Into<String>) -> Self {
        VectorError::BuildFailed {
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        VectorError::Config {
            message: message.into(),
        }
    }

    /// Check if this is a validation error (bad input from the caller)
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            VectorError::InvalidArgument { .. } | VectorError::DimensionMismatch { .. }
        )
    }

    /// Check if this error reports a failed or cancelled migration
    pub fn is_migration_error(&self) -> bool {
        matches!(
            self,
            VectorError::MigrationEnded { .. } | VectorError::BuildFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VectorError::DimensionMismatch {
            expected: 384,
            got: 768,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 384, got 768");

        let err = VectorError::invalid_argument("empty vector");
        assert_eq!(err.to_string(), "invalid argument: empty vector");

        let err = VectorError::MigrationEnded {
            status: MigrationStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "migration ended with status CANCELLED");
    }

    #[test]
    fn test_is_validation_error() {
        assert!(VectorError::invalid_argument("x").is_validation_error());
        assert!(VectorError::DimensionMismatch {
            expected: 1,
            got: 2
        }
        .is_validation_error());
        assert!(!VectorError::out_of_memory("ids").is_validation_error());
        assert!(!VectorError::config("bad").is_validation_error());
    }

    #[test]
    fn test_is_migration_error() {
        assert!(VectorError::build_failed("boom").is_migration_error());
        assert!(VectorError::MigrationEnded {
            status: MigrationStatus::Failed
        }
        .is_migration_error());
        assert!(!VectorError::not_applicable("done").is_migration_error());
    }
}
