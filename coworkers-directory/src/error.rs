//! Error types for coworkers-directory.

use thiserror::Error;

/// All errors that can arise while talking to the directory service.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport failure or a status other than 200.
    #[error("service not available at {url}: {reason}")]
    ServiceUnavailable { url: String, reason: String },

    /// Every attempt of a retried download failed.
    #[error("too many retries ({attempts}) fetching {url}")]
    TooManyRetries {
        url: String,
        attempts: usize,
        #[source]
        last: Box<DirectoryError>,
    },

    /// The employee payload is not a JSON array of objects.
    #[error("invalid employee payload: {0}")]
    InvalidPayload(String),

    /// Photo bytes could not be decoded or re-encoded.
    #[error("invalid image from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
}

/// Convenience constructor for [`DirectoryError::ServiceUnavailable`].
pub(crate) fn unavailable(url: &str, reason: impl Into<String>) -> DirectoryError {
    DirectoryError::ServiceUnavailable {
        url: url.to_string(),
        reason: reason.into(),
    }
}
