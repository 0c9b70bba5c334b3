//! In-memory contact store.

use std::collections::HashMap;

use coworkers_core::{
    Contact, ContactPhoto, ContactStore, DataError, Employee, Group, LocalId,
};

use crate::ledger::{ContactRecord, Ledger};

/// A [`ContactStore`] that lives only as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    ledger: Ledger,
    photos: HashMap<LocalId, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn record(&self, uid: &str) -> Option<&ContactRecord> {
        self.ledger.find_contact(uid)
    }

    pub fn photo_bytes(&self, local_id: LocalId) -> Option<&[u8]> {
        self.photos.get(&local_id).map(Vec::as_slice)
    }
}

impl ContactStore for MemoryStore {
    fn find_group_by_uid(&mut self, uid: &str) -> Result<Option<Group>, DataError> {
        Ok(self.ledger.find_group(uid).map(|g| g.to_group()))
    }

    fn create_group(&mut self, uid: &str, title: &str) -> Result<Group, DataError> {
        self.ledger.create_group(uid, title)
    }

    fn update_group_title(&mut self, group: &Group, title: &str) -> Result<(), DataError> {
        self.ledger.update_group_title(group, title).map(|_| ())
    }

    fn find_contacts_by_group(&mut self, group: &Group) -> Result<Vec<Contact>, DataError> {
        Ok(self
            .ledger
            .contacts_in(group.local_id)
            .map(ContactRecord::to_contact)
            .collect())
    }

    fn find_contact_by_uid(&mut self, uid: &str) -> Result<Option<Contact>, DataError> {
        Ok(self.ledger.find_contact(uid).map(ContactRecord::to_contact))
    }

    fn create_contact(
        &mut self,
        group: &Group,
        employee: &Employee,
        prefer_native_name: bool,
    ) -> Result<Contact, DataError> {
        self.ledger
            .create_contact(group, employee, prefer_native_name)
    }

    fn update_contact(
        &mut self,
        contact: &Contact,
        employee: &Employee,
        prefer_native_name: bool,
    ) -> Result<(), DataError> {
        self.ledger
            .update_contact(contact, employee, prefer_native_name)
            .map(|_| ())
    }

    fn delete_contact(&mut self, contact: &Contact) -> Result<(), DataError> {
        self.ledger.delete_contact(contact)?;
        self.photos.remove(&contact.local_id);
        Ok(())
    }

    fn find_photo(&mut self, contact: &Contact) -> Result<ContactPhoto, DataError> {
        Ok(self.ledger.contact(contact.local_id)?.photo.clone())
    }

    fn update_photo_bytes(
        &mut self,
        contact: &Contact,
        bytes: Option<&[u8]>,
    ) -> Result<(), DataError> {
        let record = self.ledger.contact_mut(contact.local_id)?;
        record.photo.mark_synced();
        match bytes {
            Some(bytes) => {
                self.photos.insert(contact.local_id, bytes.to_vec());
            }
            None => {
                self.photos.remove(&contact.local_id);
            }
        }
        Ok(())
    }
}
