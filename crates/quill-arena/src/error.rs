//! Error handling for the arena allocator.
//!
//! Allocation failures are recoverable: the arena stays valid and callers
//! may retry or abort. Precondition violations (zero or non-power-of-two
//! alignment, size overflow) are bugs and panic instead.

use thiserror::Error;

/// Result type alias for arena operations.
pub type ArenaResult<T> = std::result::Result<T, ArenaError>;

/// Errors produced by arena operations.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The page source could not provide a block for this request.
    ///
    /// The arena remains usable; a later attempt may succeed once memory
    /// pressure eases.
    #[error("allocation of {size} bytes (align {align}) failed: page source exhausted")]
    AllocationFailed {
        /// Requested payload size in bytes.
        size: usize,
        /// Requested alignment.
        align: usize,
    },

    /// Invalid arena configuration.
    #[error("invalid arena configuration: {message}")]
    InvalidConfig {
        /// Description of the offending field.
        message: String,
    },
}

impl ArenaError {
    /// Returns true if retrying the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArenaError::AllocationFailed { size: 64, align: 8 };
        assert_eq!(
            err.to_string(),
            "allocation of 64 bytes (align 8) failed: page source exhausted"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ArenaError::AllocationFailed { size: 1, align: 1 }.is_retryable());
        assert!(!ArenaError::invalid_config("bad").is_retryable());
    }
}
