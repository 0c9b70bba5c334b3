//! Error types for coworkers-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failure at the contact-store boundary.
///
/// Every mutating [`ContactStore`](crate::ContactStore) call either applies
/// fully or returns one of these; the sync engine treats any of them as a
/// per-record failure.
#[derive(Debug, Error)]
pub enum DataError {
    /// Underlying I/O failure, with the path that was touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record the caller referred to no longer exists.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Persisted store content could not be decoded.
    #[error("store at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The backend refused the batch.
    #[error("store rejected operation: {0}")]
    Rejected(String),
}

/// Convenience constructor for [`DataError::Io`].
pub fn data_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DataError {
    DataError::Io {
        path: path.into(),
        source,
    }
}

/// All errors that can arise while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// Sign-in attempted while an account is already configured.
    #[error("an account already exists at {path}; sign out first")]
    AccountExists { path: PathBuf },

    /// A command needs an account and none is configured.
    #[error("no account configured at {path}; run `coworkers sign-in` first")]
    AccountMissing { path: PathBuf },

    /// A settings key or value was rejected.
    #[error("invalid setting {key}={value}: expected {expected}")]
    InvalidSetting {
        key: String,
        value: String,
        expected: &'static str,
    },
}
