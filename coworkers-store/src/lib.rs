//! # coworkers-store
//!
//! [`ContactStore`](coworkers_core::ContactStore) backends.
//!
//! - [`MemoryStore`]: process-local, used by tests and experiments
//! - [`FileStore`]: one JSON document per account under `~/.coworkers/store/`,
//!   photo bytes under `~/.coworkers/photos/`
//!
//! Both keep their records in a [`Ledger`], which implements the record-level
//! rules once.

pub mod file;
pub mod ledger;
pub mod memory;

pub use file::FileStore;
pub use ledger::{ContactRecord, GroupRecord, Ledger};
pub use memory::MemoryStore;
