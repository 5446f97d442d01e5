//! Error types for the Qibo client.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::archive::ArchiveError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur when talking to the QRC cluster.
///
/// Sibling operations deliberately surface failures differently:
/// [`QiboJob::status`](crate::QiboJob::status) propagates the raw
/// [`ClientError::Http`] while [`QiboJob::refresh`](crate::QiboJob::refresh)
/// reports [`ClientError::JobApi`]. Archive corruption is absorbed by
/// [`QiboJob::result`](crate::QiboJob::result), payload decoding is not.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Transport failure or a non-2xx response without a structured body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server reported an error with a `detail` message.
    #[error("Job API error ({code}): {detail}")]
    JobApi { code: u16, detail: String },

    /// The response body lacked the keys the protocol requires.
    #[error("Malformed server response: {0}")]
    MalformedResponse(String),

    /// The result body could not be unpacked.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The extracted payload file could not be deserialized.
    #[error("Failed to decode payload {}: {message}", path.display())]
    PayloadDecode { path: PathBuf, message: String },

    /// Client and server circuit-library versions differ.
    #[error(
        "Local Qibo package version does not match the server one, please upgrade: {local} -> {server}"
    )]
    VersionMismatch { local: String, server: String },

    /// A polling deadline elapsed before the job reached a terminal state.
    #[error("Timeout after {waited:?} waiting for {url}")]
    Timeout { url: String, waited: Duration },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller asked for something the server would reject.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
