//! Error types for the narration pipeline

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the narration pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Synthesis errors
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A single segment failed; sibling segments are unaffected
    #[error("Segment {index} failed: {source}")]
    Segment {
        index: usize,
        source: SynthesisError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the synthesis provider boundary
///
/// Duration-parse and matching degradations are not errors; they are
/// carried as flags on the affected results.
#[derive(Error, Debug, Clone)]
pub enum SynthesisError {
    /// The provider did not respond within the request timeout
    #[error("Synthesis request timed out after {0:?}")]
    Timeout(Duration),

    /// Provider-reported failure with upstream status and message
    #[error("Provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    /// Missing or invalid audio payload; fatal for that segment
    #[error("Malformed synthesis response: {0}")]
    MalformedResponse(String),

    /// The request was cancelled before completion
    #[error("Synthesis cancelled")]
    Cancelled,
}

/// Errors from the segment cache boundary
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Underlying store failure (connection, capacity, ...)
    #[error("Store error: {0}")]
    Store(String),

    /// A cached entry could not be decoded
    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),
}
