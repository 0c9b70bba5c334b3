//! Error types for coworkers-sync.

use std::path::PathBuf;

use thiserror::Error;

use coworkers_core::error::{ConfigError, DataError};
use coworkers_directory::DirectoryError;

/// Errors that stop the pipeline before or after a pass. Failures inside a
/// pass never surface here; they become a [`RunStatus`](crate::RunStatus).
#[derive(Debug, Error)]
pub enum SyncError {
    /// Settings or account could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The local store could not be opened.
    #[error("store error: {0}")]
    Data(#[from] DataError),

    /// Credentials check against the directory failed.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run state JSON could not be encoded or decoded.
    #[error("run state JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Cooperative cancellation was observed between two units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sync was cancelled")]
pub struct Interrupted;
