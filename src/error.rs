//! Error types for the voice tutor

use thiserror::Error;

/// Result type alias for tutor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the tutoring pipeline
///
/// Every variant is recoverable: callers at the edge of a turn convert
/// them into a fallback message instead of ending the session.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (credential, model, paths)
    #[error("configuration error: {0}")]
    Config(String),

    /// Request reached the remote side but did not succeed (status, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// Response did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Payload was empty or unusable
    #[error("content error: {0}")]
    Content(String),

    /// Audio decode or output device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error came from the transport layer rather than the payload
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http(_))
    }
}
