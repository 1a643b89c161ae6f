//! Error types for financial data retrieval

use thiserror::Error;

/// Data retrieval specific errors
#[derive(Debug, Error)]
pub enum DataError {
    /// Provider API request failed
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Invalid company code supplied
    #[error("Invalid company code: {0}")]
    InvalidCode(String),

    /// Data not available for the requested company
    #[error("Data not available for {code}: {reason}")]
    DataUnavailable { code: String, reason: String },

    /// Rate limit exceeded for the backing API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Record decoding error
    #[error("Decode error: {0}")]
    DecodeError(#[from] serde_json::Error),
}

/// Result type alias for data operations
pub type Result<T> = std::result::Result<T, DataError>;
