//! One-way photo sync for reconciled contacts.
//!
//! Per contact, evaluated fresh on every pass:
//!
//! 1. photo sync disabled: nothing happens for any contact
//! 2. network unsuitable for the policy: deferred to the next pass
//! 3. photo already synced: nothing to do
//! 4. no URL: stored bytes are cleared
//! 5. otherwise: download, transcode, store; only a full success marks the
//!    photo synced

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use coworkers_core::{Contact, ContactStore, PhotoSync, Uid};
use coworkers_directory::Directory;

use crate::cancel::checkpoint;
use crate::connectivity::{is_suitable, Connectivity};
use crate::error::Interrupted;

/// Per-pass photo counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhotoStats {
    pub downloaded: usize,
    pub cleared: usize,
    pub deferred: usize,
    pub failed: usize,
}

/// What happened to one contact's photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhotoOutcome {
    UpToDate,
    Downloaded,
    Cleared,
    Deferred,
}

pub struct PhotoSyncer<'a, S: ContactStore + ?Sized, D: Directory + ?Sized> {
    store: &'a mut S,
    directory: &'a D,
    connectivity: &'a dyn Connectivity,
    policy: PhotoSync,
    stats: PhotoStats,
}

impl<'a, S: ContactStore + ?Sized, D: Directory + ?Sized> PhotoSyncer<'a, S, D> {
    pub fn new(
        store: &'a mut S,
        directory: &'a D,
        connectivity: &'a dyn Connectivity,
        policy: PhotoSync,
    ) -> Self {
        Self {
            store,
            directory,
            connectivity,
            policy,
            stats: PhotoStats::default(),
        }
    }

    pub fn stats(&self) -> PhotoStats {
        self.stats
    }

    /// Sync the photo of every contact in `contacts`. A failing contact is
    /// counted and left unsynced for the next pass.
    pub fn sync(
        &mut self,
        contacts: &BTreeMap<Uid, Contact>,
        cancel: &CancellationToken,
    ) -> Result<(), Interrupted> {
        if !self.policy.enabled() {
            tracing::debug!("sync of photos disabled");
            return Ok(());
        }

        for (uid, contact) in contacts {
            checkpoint(cancel)?;

            tracing::debug!("sync photo for {uid}");
            match self.sync_one(contact) {
                Ok(PhotoOutcome::UpToDate) => {}
                Ok(PhotoOutcome::Downloaded) => self.stats.downloaded += 1,
                Ok(PhotoOutcome::Cleared) => self.stats.cleared += 1,
                Ok(PhotoOutcome::Deferred) => self.stats.deferred += 1,
                Err(reason) => {
                    tracing::warn!("photo for {uid} not synced: {reason}");
                    self.stats.failed += 1;
                }
            }
        }
        Ok(())
    }

    fn sync_one(&mut self, contact: &Contact) -> Result<PhotoOutcome, String> {
        if !is_suitable(self.policy, self.connectivity.state()) {
            return Ok(PhotoOutcome::Deferred);
        }

        let photo = self.store.find_photo(contact).map_err(|e| e.to_string())?;
        if photo.is_synced() {
            return Ok(PhotoOutcome::UpToDate);
        }

        let Some(url) = photo.url() else {
            self.store
                .update_photo_bytes(contact, None)
                .map_err(|e| e.to_string())?;
            return Ok(PhotoOutcome::Cleared);
        };

        let bytes = self.directory.fetch_photo(url).map_err(|e| e.to_string())?;
        self.store
            .update_photo_bytes(contact, Some(&bytes))
            .map_err(|e| e.to_string())?;
        Ok(PhotoOutcome::Downloaded)
    }
}
