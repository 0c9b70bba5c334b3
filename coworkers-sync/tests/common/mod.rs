//! Shared fakes for the sync integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use coworkers_core::{
    Contact, ContactPhoto, ContactStore, DataError, Employee, Group,
};
use coworkers_directory::{Credentials, Directory, DirectoryError};
use coworkers_store::MemoryStore;
use coworkers_sync::CancellationToken;

// ---------------------------------------------------------------------------
// Directory fake
// ---------------------------------------------------------------------------

/// Scripted directory: a fixed employee list (or failure), photos rendered
/// from their URL, and optional cancellation hooks.
#[derive(Default)]
pub struct ScriptedDirectory {
    pub employees: Vec<Employee>,
    pub unavailable: bool,
    pub broken_photos: Vec<String>,
    /// Cancelled right after the employee list is served.
    pub cancel_after_fetch: Option<CancellationToken>,
    /// Cancelled right after the first photo is served.
    pub cancel_after_photo: Option<CancellationToken>,
    pub fetches: Cell<usize>,
    pub photo_requests: RefCell<Vec<String>>,
}

impl ScriptedDirectory {
    pub fn serving(employees: Vec<Employee>) -> Self {
        Self {
            employees,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

impl Directory for ScriptedDirectory {
    fn fetch_employees(
        &self,
        endpoint: &str,
        _credentials: &Credentials,
    ) -> Result<Vec<Employee>, DirectoryError> {
        self.fetches.set(self.fetches.get() + 1);
        if self.unavailable {
            return Err(DirectoryError::TooManyRetries {
                url: endpoint.to_string(),
                attempts: 3,
                last: Box::new(DirectoryError::ServiceUnavailable {
                    url: endpoint.to_string(),
                    reason: "503".to_string(),
                }),
            });
        }
        if let Some(token) = &self.cancel_after_fetch {
            token.cancel();
        }
        Ok(self.employees.clone())
    }

    fn fetch_photo(&self, url: &str) -> Result<Vec<u8>, DirectoryError> {
        self.photo_requests.borrow_mut().push(url.to_string());
        if self.broken_photos.iter().any(|u| u == url) {
            return Err(DirectoryError::ServiceUnavailable {
                url: url.to_string(),
                reason: "404".to_string(),
            });
        }
        if let Some(token) = &self.cancel_after_photo {
            token.cancel();
        }
        Ok(format!("png:{url}").into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Store fake
// ---------------------------------------------------------------------------

/// [`MemoryStore`] that rejects chosen operations.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_group: bool,
    pub fail_create: HashSet<String>,
    pub fail_update: HashSet<String>,
    pub fail_delete: HashSet<String>,
    /// Cancelled right after the first successful create.
    pub cancel_after_create: Option<CancellationToken>,
}

fn rejected(op: &str, uid: &str) -> DataError {
    DataError::Rejected(format!("{op} {uid} refused"))
}

impl ContactStore for FailingStore {
    fn find_group_by_uid(&mut self, uid: &str) -> Result<Option<Group>, DataError> {
        if self.fail_group {
            return Err(rejected("find group", uid));
        }
        self.inner.find_group_by_uid(uid)
    }

    fn create_group(&mut self, uid: &str, title: &str) -> Result<Group, DataError> {
        self.inner.create_group(uid, title)
    }

    fn update_group_title(&mut self, group: &Group, title: &str) -> Result<(), DataError> {
        self.inner.update_group_title(group, title)
    }

    fn find_contacts_by_group(&mut self, group: &Group) -> Result<Vec<Contact>, DataError> {
        self.inner.find_contacts_by_group(group)
    }

    fn find_contact_by_uid(&mut self, uid: &str) -> Result<Option<Contact>, DataError> {
        self.inner.find_contact_by_uid(uid)
    }

    fn create_contact(
        &mut self,
        group: &Group,
        employee: &Employee,
        prefer_native_name: bool,
    ) -> Result<Contact, DataError> {
        if self.fail_create.contains(&employee.uid().0) {
            return Err(rejected("create", &employee.uid().0));
        }
        let contact = self.inner.create_contact(group, employee, prefer_native_name)?;
        if let Some(token) = &self.cancel_after_create {
            token.cancel();
        }
        Ok(contact)
    }

    fn update_contact(
        &mut self,
        contact: &Contact,
        employee: &Employee,
        prefer_native_name: bool,
    ) -> Result<(), DataError> {
        if self.fail_update.contains(&contact.uid.0) {
            return Err(rejected("update", &contact.uid.0));
        }
        self.inner.update_contact(contact, employee, prefer_native_name)
    }

    fn delete_contact(&mut self, contact: &Contact) -> Result<(), DataError> {
        if self.fail_delete.contains(&contact.uid.0) {
            return Err(rejected("delete", &contact.uid.0));
        }
        self.inner.delete_contact(contact)
    }

    fn find_photo(&mut self, contact: &Contact) -> Result<ContactPhoto, DataError> {
        self.inner.find_photo(contact)
    }

    fn update_photo_bytes(
        &mut self,
        contact: &Contact,
        bytes: Option<&[u8]>,
    ) -> Result<(), DataError> {
        self.inner.update_photo_bytes(contact, bytes)
    }
}

pub fn set(uids: &[&str]) -> HashSet<String> {
    uids.iter().map(|u| u.to_string()).collect()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
