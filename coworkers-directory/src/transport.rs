//! Blocking HTTP GET with optional Basic authorization.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{unavailable, DirectoryError};

/// Largest body accepted from the directory (employee list or photo).
pub const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

/// Username/password pair sent as HTTP Basic authorization.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic base64(username:password)`
    pub fn authorization(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw.as_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// One download, no retries. Any status other than 200 is a failure.
pub trait Transport {
    fn get(&self, url: &str, credentials: Option<&Credentials>) -> Result<Vec<u8>, DirectoryError>;
}

/// [`Transport`] backed by a shared `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .user_agent(concat!("coworkers/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str, credentials: Option<&Credentials>) -> Result<Vec<u8>, DirectoryError> {
        tracing::debug!("download {url}");
        let mut request = self.agent.get(url);
        if let Some(credentials) = credentials {
            request = request.set("Authorization", &credentials.authorization());
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(unavailable(url, format!("status {code}")));
            }
            Err(err) => return Err(unavailable(url, err.to_string())),
        };
        if response.status() != 200 {
            return Err(unavailable(url, format!("status {}", response.status())));
        }

        read_body(url, response.into_reader(), MAX_BODY_BYTES)
    }
}

/// Read at most `limit` bytes; a longer body is an error, never truncated.
fn read_body(url: &str, reader: impl Read, limit: u64) -> Result<Vec<u8>, DirectoryError> {
    let mut body = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|e| unavailable(url, e.to_string()))?;
    if body.len() as u64 > limit {
        return Err(unavailable(url, format!("body too large (over {limit} bytes)")));
    }
    Ok(body)
}
