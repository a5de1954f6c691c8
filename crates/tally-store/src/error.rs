//! Error types and utilities for document store operations.

use std::time::Duration;

/// Result type for all store operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// NATS client/connection errors
    #[error("NATS connection error: {0}")]
    Connection(#[from] async_nats::Error),

    /// Serialization errors when encoding or decoding documents
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Vote target does not address an option of the poll
    #[error("Option index {index} is out of range for a poll with {len} options")]
    OptionOutOfRange { index: usize, len: usize },

    /// Compare-and-swap retries were exhausted
    #[error("Gave up updating '{key}' after {attempts} conflicting writes")]
    Contention { key: String, attempts: u32 },

    /// Generic operation error with context
    #[error("Store operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Create an operation error with context
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a timeout error with the given duration
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Create a contention error for the given key
    pub fn contention(key: impl Into<String>, attempts: u32) -> Self {
        Self::Contention {
            key: key.into(),
            attempts,
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Timeout { .. } | Error::Contention { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error() {
        let error = Error::operation("kv_put", "bucket offline");
        assert_eq!(
            error.to_string(),
            "Store operation failed: kv_put - bucket offline"
        );
        assert!(!error.is_transient());
    }

    #[test]
    fn test_option_out_of_range() {
        let error = Error::OptionOutOfRange { index: 4, len: 2 };
        assert!(error.to_string().contains("index 4"));
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::timeout(Duration::from_secs(1)).is_transient());
        assert!(Error::contention("polls.x", 8).is_transient());
        assert!(!Error::invalid_config("missing url").is_transient());
    }
}
