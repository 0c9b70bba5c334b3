//! # coworkers-directory
//!
//! Client for the remote employee directory.
//!
//! [`DirectoryClient`] fetches the employee list (with a fixed number of
//! immediate retries) and downloads photos, transcoding them to PNG. The sync
//! engine depends only on the [`Directory`] trait so tests can script it.

pub mod client;
pub mod employee;
pub mod error;
pub mod photo;
pub mod transport;

pub use client::{Directory, DirectoryClient, RETRIES_MAX};
pub use employee::{parse_employees, ParsedEmployees, RecordError};
pub use error::DirectoryError;
pub use transport::{Credentials, Transport, UreqTransport};
