//! Unified error handling utilities
//!
//! Configuration errors get their own type so startup can report exactly
//! which variable is wrong. Everything above the library boundary (binaries,
//! the conformance harness) uses anyhow with the context helpers below.

use thiserror::Error;

pub use anyhow::{Context, Error};

/// Result alias for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors produced while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is present but its value is unusable
    #[error("Invalid configuration for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// Error context builders for common operations
pub trait ErrorContextExt<T> {
    /// Add vector store operation context
    fn vector_store_context(self, operation: &str) -> anyhow::Result<T>;
}

impl<T, E> ErrorContextExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn vector_store_context(self, operation: &str) -> anyhow::Result<T> {
        self.with_context(|| format!("Vector store operation failed: {}", operation))
    }
}

/// Check if an error is retryable
pub fn is_retryable(error: &Error) -> bool {
    let error_str = format!("{:#}", error).to_lowercase();

    // Network and temporary errors are retryable
    error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("connection")
        || error_str.contains("try again")
        || error_str.contains("unavailable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_error_context_builders() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("socket closed"));

        let with_context = result.vector_store_context("upsert");
        let error_msg = format!("{:#}", with_context.unwrap_err());
        assert!(error_msg.contains("Vector store operation failed: upsert"));
        assert!(error_msg.contains("socket closed"));
    }

    #[test]
    fn test_is_retryable() {
        let retryable = anyhow!("connection refused");
        assert!(is_retryable(&retryable));

        let wrapped = anyhow!("service unavailable").context("step 'health' failed");
        assert!(is_retryable(&wrapped));

        let permanent = anyhow!("bad request: wrong vector dimension");
        assert!(!is_retryable(&permanent));
    }

    #[test]
    fn test_invalid_message_names_key() {
        let err = ConfigError::invalid("VECTOR_SIZE", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for VECTOR_SIZE: must be greater than zero"
        );
    }
}
