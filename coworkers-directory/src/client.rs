//! The directory client used by the sync engine.

use coworkers_core::Employee;

use crate::employee::parse_employees;
use crate::error::DirectoryError;
use crate::photo::to_png;
use crate::transport::{Credentials, Transport, UreqTransport};

/// Attempts made for the employee list before giving up. Retries are
/// immediate; there is no delay between attempts.
pub const RETRIES_MAX: usize = 3;

/// Capability the sync engine consumes.
pub trait Directory {
    /// Download and parse the employee list. Malformed records are skipped;
    /// transport failures are retried up to [`RETRIES_MAX`] times.
    fn fetch_employees(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Employee>, DirectoryError>;

    /// Download one photo and transcode it to PNG.
    fn fetch_photo(&self, url: &str) -> Result<Vec<u8>, DirectoryError>;
}

/// [`Directory`] over any [`Transport`]; `ureq` by default.
#[derive(Debug, Clone)]
pub struct DirectoryClient<T = UreqTransport> {
    transport: T,
}

impl Default for DirectoryClient<UreqTransport> {
    fn default() -> Self {
        Self::new(UreqTransport::default())
    }
}

impl<T: Transport> DirectoryClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn download_with_retries(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<Vec<u8>, DirectoryError> {
        let mut last = None;
        for attempt in 1..=RETRIES_MAX {
            match self.transport.get(url, Some(credentials)) {
                Ok(body) => return Ok(body),
                Err(err) => {
                    tracing::debug!("attempt {attempt}/{RETRIES_MAX}: {err}");
                    last = Some(err);
                }
            }
        }
        Err(DirectoryError::TooManyRetries {
            url: url.to_string(),
            attempts: RETRIES_MAX,
            last: Box::new(last.unwrap_or_else(|| DirectoryError::ServiceUnavailable {
                url: url.to_string(),
                reason: "no attempt made".to_string(),
            })),
        })
    }
}

impl<T: Transport> Directory for DirectoryClient<T> {
    fn fetch_employees(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Employee>, DirectoryError> {
        tracing::debug!("get employees from {endpoint}");
        let body = self.download_with_retries(endpoint, credentials)?;
        let parsed = parse_employees(&body)?;
        if parsed.skipped > 0 {
            tracing::warn!("skipped {} malformed employee record(s)", parsed.skipped);
        }
        Ok(parsed.employees)
    }

    fn fetch_photo(&self, url: &str) -> Result<Vec<u8>, DirectoryError> {
        tracing::debug!("get photo from {url}");
        let raw = self.transport.get(url, None)?;
        to_png(&raw).map_err(|source| DirectoryError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
