//! Coworkers core library: domain types, the contact store capability,
//! configuration persistence, errors.
//!
//! - [`types`]: employees, contacts, photos, groups, run statistics
//! - [`store`]: the [`ContactStore`] trait every storage backend implements
//! - [`config`]: settings and account files under `~/.coworkers/`
//! - [`error`]: [`DataError`] and [`ConfigError`]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{Account, PhotoSync, Settings, SyncFrequency};
pub use error::{ConfigError, DataError};
pub use store::ContactStore;
pub use types::{
    Contact, ContactPhoto, Employee, Group, LocalId, PersonName, SyncStats, Uid, GROUP_UID,
};
