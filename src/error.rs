//! Error types for the Euterpe feed service
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for propagation at the binary boundary.

use thiserror::Error;

/// Main error type for Euterpe operations
#[derive(Error, Debug)]
pub enum EuterpeError {
    /// Referenced activity does not exist in the feed
    #[error("Activity not found: {0}")]
    NotFound(String),

    /// Activity exists but lacks the genre attribute an operation requires
    #[error("Activity {0} has no genre")]
    MissingGenre(String),

    /// A rebuild for this user is already in flight
    #[error("Rebuild already running for user: {0}")]
    RebuildInFlight(String),

    /// Feed store request failed or the store is unreachable
    #[error("Feed store unavailable: {0}")]
    StoreUnavailable(String),

    /// Feed store rejected the request (malformed call)
    #[error("Feed store API error: {0}")]
    StoreApi(String),

    /// Relevance oracle is unreachable or rate-limited
    #[error("Relevance oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Oracle rejected the request (bad key, malformed call)
    #[error("Oracle API error: {0}")]
    OracleApi(String),

    /// Engagement ledger could not be read or written
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Euterpe operations
pub type Result<T> = std::result::Result<T, EuterpeError>;

/// Convert anyhow::Error to EuterpeError
impl From<anyhow::Error> for EuterpeError {
    fn from(err: anyhow::Error) -> Self {
        EuterpeError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EuterpeError::NotFound("post:Post:9".to_string());
        assert_eq!(err.to_string(), "Activity not found: post:Post:9");

        let err = EuterpeError::MissingGenre("post:Post:3".to_string());
        assert_eq!(err.to_string(), "Activity post:Post:3 has no genre");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EuterpeError = io_err.into();
        assert!(matches!(err, EuterpeError::Io(_)));

        let anyhow_err = anyhow::anyhow!("wrapped");
        let err: EuterpeError = anyhow_err.into();
        assert!(matches!(err, EuterpeError::Other(_)));
    }
}
