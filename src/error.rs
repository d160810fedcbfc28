//! Error types for request dispatch.
//!
//! # Design Decisions
//! - One enum for everything that can fail a dispatch; callers match on it
//! - Transport errors are wrapped, never retried or rewritten
//! - Malformed request bodies are not errors (decoding degrades to raw text)

use thiserror::Error;

/// Errors that can abort a dispatch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A middleware called its continuation more than once.
    #[error("next() called multiple times (middleware index {index})")]
    DoubleInvocation { index: usize },

    /// The composed URL could not be parsed.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request method is not a valid HTTP token.
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A caller-supplied header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A response payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The underlying HTTP client failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An error raised by a middleware.
    #[error("middleware error: {0}")]
    Middleware(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FetchError {
    /// Wrap an arbitrary error raised inside a middleware.
    pub fn middleware<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        FetchError::Middleware(err.into())
    }
}

/// Result type for dispatch operations.
pub type FetchResult<T> = Result<T, FetchError>;
