//! The contact-store capability.
//!
//! The sync engine only talks to local storage through [`ContactStore`].
//! Each mutating method is one batch: it applies every field write for one
//! record or none of them, and reports failure as a [`DataError`].

use crate::error::DataError;
use crate::types::{Contact, ContactPhoto, Employee, Group};

pub trait ContactStore {
    fn find_group_by_uid(&mut self, uid: &str) -> Result<Option<Group>, DataError>;

    fn create_group(&mut self, uid: &str, title: &str) -> Result<Group, DataError>;

    fn update_group_title(&mut self, group: &Group, title: &str) -> Result<(), DataError>;

    /// All contacts that belong to `group`.
    fn find_contacts_by_group(&mut self, group: &Group) -> Result<Vec<Contact>, DataError>;

    fn find_contact_by_uid(&mut self, uid: &str) -> Result<Option<Contact>, DataError>;

    /// Creates a contact in `group` carrying the employee's current fields.
    /// The new photo sub-record points at the employee's photo URL, unsynced.
    fn create_contact(
        &mut self,
        group: &Group,
        employee: &Employee,
        prefer_native_name: bool,
    ) -> Result<Contact, DataError>;

    /// Overwrites the contact's fields from the employee. The photo URL goes
    /// through [`ContactPhoto::update`] so staleness is tracked.
    fn update_contact(
        &mut self,
        contact: &Contact,
        employee: &Employee,
        prefer_native_name: bool,
    ) -> Result<(), DataError>;

    fn delete_contact(&mut self, contact: &Contact) -> Result<(), DataError>;

    fn find_photo(&mut self, contact: &Contact) -> Result<ContactPhoto, DataError>;

    /// Stores (or with `None` clears) the image bytes and marks the photo
    /// synced in the same batch.
    fn update_photo_bytes(&mut self, contact: &Contact, bytes: Option<&[u8]>)
        -> Result<(), DataError>;
}
