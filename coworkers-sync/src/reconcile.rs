//! Three-way diff between directory employees and local contacts.
//!
//! Operations are issued in a fixed order: creates, then updates, then
//! deletes. Each one is a single store batch; a failing batch is counted as
//! skipped and the pass moves on.

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;

use coworkers_core::{Contact, ContactStore, Employee, Group, SyncStats, Uid};

use crate::cancel::checkpoint;
use crate::error::Interrupted;

/// Applies one pass of create/update/delete operations to a store.
///
/// Counters stay readable through [`Reconciler::stats`] after an
/// interruption, so a partial pass can still be reported.
pub struct Reconciler<'a, S: ContactStore + ?Sized> {
    store: &'a mut S,
    group: &'a Group,
    prefer_native_names: bool,
    stats: SyncStats,
}

impl<'a, S: ContactStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a mut S, group: &'a Group, prefer_native_names: bool) -> Self {
        Self {
            store,
            group,
            prefer_native_names,
            stats: SyncStats::default(),
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Bring `contacts` in line with `employees` and return the resulting
    /// keyed contact set: previous contacts plus successful creates minus
    /// successful deletes.
    pub fn reconcile(
        &mut self,
        employees: &BTreeMap<Uid, Employee>,
        mut contacts: BTreeMap<Uid, Contact>,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<Uid, Contact>, Interrupted> {
        let created = self.create_missing(employees, &contacts, cancel)?;
        tracing::debug!("created {} contacts", self.stats.inserted);

        self.update_existing(employees, &contacts, cancel)?;
        tracing::debug!("updated {} contacts", self.stats.updated);

        let removed = self.remove_obsolete(employees, &contacts, cancel)?;
        tracing::debug!("removed {} contacts", self.stats.deleted);
        tracing::debug!("skipped {} contacts", self.stats.skipped);

        for contact in created {
            contacts.insert(contact.uid.clone(), contact);
        }
        for uid in removed {
            contacts.remove(&uid);
        }
        Ok(contacts)
    }

    fn create_missing(
        &mut self,
        employees: &BTreeMap<Uid, Employee>,
        contacts: &BTreeMap<Uid, Contact>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Contact>, Interrupted> {
        let mut created = Vec::new();
        for (uid, employee) in employees {
            if contacts.contains_key(uid) {
                continue;
            }
            checkpoint(cancel)?;

            tracing::debug!("create contact for {uid}");
            match self
                .store
                .create_contact(self.group, employee, self.prefer_native_names)
            {
                Ok(contact) => {
                    created.push(contact);
                    self.stats.inserted += 1;
                }
                Err(err) => {
                    tracing::warn!("contact for {uid} not created: {err}");
                    self.stats.skipped += 1;
                }
            }
        }
        Ok(created)
    }

    fn update_existing(
        &mut self,
        employees: &BTreeMap<Uid, Employee>,
        contacts: &BTreeMap<Uid, Contact>,
        cancel: &CancellationToken,
    ) -> Result<(), Interrupted> {
        for (uid, employee) in employees {
            let Some(contact) = contacts.get(uid) else {
                continue;
            };
            checkpoint(cancel)?;

            tracing::debug!("update contact for {uid}");
            match self
                .store
                .update_contact(contact, employee, self.prefer_native_names)
            {
                Ok(()) => self.stats.updated += 1,
                Err(err) => {
                    tracing::warn!("contact for {uid} not updated: {err}");
                    self.stats.skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn remove_obsolete(
        &mut self,
        employees: &BTreeMap<Uid, Employee>,
        contacts: &BTreeMap<Uid, Contact>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Uid>, Interrupted> {
        let mut removed = Vec::new();
        for (uid, contact) in contacts {
            if employees.contains_key(uid) {
                continue;
            }
            checkpoint(cancel)?;

            tracing::debug!("remove contact for {uid}");
            match self.store.delete_contact(contact) {
                Ok(()) => {
                    removed.push(uid.clone());
                    self.stats.deleted += 1;
                }
                Err(err) => {
                    tracing::warn!("contact for {uid} not removed: {err}");
                    self.stats.skipped += 1;
                }
            }
        }
        Ok(removed)
    }
}
