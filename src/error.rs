//! Error types for Sidetree DID client operations.
//!
//! Every operation in this crate returns [`ClientError`]. It uses the
//! `thiserror` crate for error handling; nothing is retried or recovered
//! internally, errors always propagate to the caller.

use thiserror::Error;
use url::ParseError;

/// Errors that can occur while building requests, writing to a channel
/// or resolving DID documents
#[derive(Error, Debug)]
pub enum ClientError {
    /// The namespace is not registered with the client
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// The document or operation payload is malformed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The channel, or the requested peer on it, cannot be reached
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// The content address is already bound to different content
    #[error("Write conflict at address {0}")]
    WriteConflict(String),

    /// No document or content exists for the given identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// The DID format is invalid
    #[error("Invalid DID format: {0}")]
    InvalidDidFormat(String),

    /// The REST endpoint answered with a non-success status
    #[error("Request failed with HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlError(#[from] ParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("Base64 decoding error: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),

    /// JSON canonicalization error
    #[error("Canonicalization error: {0}")]
    CanonicalizeError(String),

    /// Multihash error
    #[error("Multihash error: {0}")]
    MultihashError(String),
}

impl From<figment::Error> for ClientError {
    fn from(err: figment::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, ClientError>;
