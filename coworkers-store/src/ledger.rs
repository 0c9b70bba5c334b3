//! Record bookkeeping shared by every store backend.
//!
//! A [`Ledger`] validates before it mutates, so a failed call leaves it
//! unchanged. Contacts are keyed by local id with a uid index beside them;
//! on disk they stay a flat list.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use coworkers_core::{
    Contact, ContactPhoto, DataError, Employee, Group, LocalId, PersonName, Uid,
};

/// A stored group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub uid: String,
    pub local_id: LocalId,
    pub title: String,
}

impl GroupRecord {
    pub fn to_group(&self) -> Group {
        Group {
            uid: self.uid.clone(),
            local_id: self.local_id,
        }
    }
}

/// A stored contact with every field the sync writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub uid: Uid,
    pub local_id: LocalId,
    pub group: LocalId,
    pub name: PersonName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skype: Option<String>,
    #[serde(default)]
    pub photo: ContactPhoto,
    /// SHA-256 of the stored PNG, when bytes are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_sha256: Option<String>,
}

impl ContactRecord {
    fn new(local_id: LocalId, group: LocalId, employee: &Employee, prefer_native: bool) -> Self {
        Self {
            uid: employee.uid().clone(),
            local_id,
            group,
            name: employee.display_name(prefer_native).clone(),
            position: employee.position().map(str::to_owned),
            email: employee.email().map(str::to_owned),
            mobile: employee.mobile().map(str::to_owned),
            skype: employee.skype().map(str::to_owned),
            photo: ContactPhoto::new(employee.photo_url().map(str::to_owned), false),
            photo_sha256: None,
        }
    }

    /// Copy the employee's fields over. Returns `false` when the record
    /// already matched.
    pub fn apply(&mut self, employee: &Employee, prefer_native: bool) -> bool {
        let name = employee.display_name(prefer_native);
        let unchanged = self.name == *name
            && self.position.as_deref() == employee.position()
            && self.email.as_deref() == employee.email()
            && self.mobile.as_deref() == employee.mobile()
            && self.skype.as_deref() == employee.skype()
            && self.photo.url() == employee.photo_url();
        if unchanged {
            return false;
        }
        self.name = name.clone();
        self.position = employee.position().map(str::to_owned);
        self.email = employee.email().map(str::to_owned);
        self.mobile = employee.mobile().map(str::to_owned);
        self.skype = employee.skype().map(str::to_owned);
        self.photo.update(employee.photo_url());
        true
    }

    /// Whether [`apply`](Self::apply) would change anything.
    pub fn differs_from(&self, employee: &Employee, prefer_native: bool) -> bool {
        self.clone().apply(employee, prefer_native)
    }

    pub fn to_contact(&self) -> Contact {
        Contact::new(self.uid.clone(), self.local_id)
    }
}

/// Groups and contacts of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LedgerFile", into = "LedgerFile")]
pub struct Ledger {
    next_id: u64,
    groups: Vec<GroupRecord>,
    contacts: BTreeMap<LocalId, ContactRecord>,
    by_uid: HashMap<Uid, LocalId>,
}

/// On-disk shape of a [`Ledger`].
#[derive(Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    groups: Vec<GroupRecord>,
    #[serde(default)]
    contacts: Vec<ContactRecord>,
}

impl From<LedgerFile> for Ledger {
    fn from(file: LedgerFile) -> Self {
        let mut ledger = Ledger {
            next_id: file.next_id,
            groups: file.groups,
            ..Ledger::default()
        };
        for record in file.contacts {
            ledger.insert(record);
        }
        ledger
    }
}

impl From<Ledger> for LedgerFile {
    fn from(ledger: Ledger) -> Self {
        LedgerFile {
            next_id: ledger.next_id,
            groups: ledger.groups,
            contacts: ledger.contacts.into_values().collect(),
        }
    }
}

impl Ledger {
    pub fn groups(&self) -> &[GroupRecord] {
        &self.groups
    }

    pub fn contacts(&self) -> &BTreeMap<LocalId, ContactRecord> {
        &self.contacts
    }

    pub fn find_group(&self, uid: &str) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.uid == uid)
    }

    pub fn find_contact(&self, uid: &str) -> Option<&ContactRecord> {
        self.by_uid
            .get(&Uid::from(uid))
            .and_then(|local_id| self.contacts.get(local_id))
    }

    pub fn contact(&self, local_id: LocalId) -> Result<&ContactRecord, DataError> {
        self.contacts
            .get(&local_id)
            .ok_or_else(|| not_found("contact", local_id))
    }

    /// Mutable access to one record. The uid must not be changed through it.
    pub fn contact_mut(&mut self, local_id: LocalId) -> Result<&mut ContactRecord, DataError> {
        self.contacts
            .get_mut(&local_id)
            .ok_or_else(|| not_found("contact", local_id))
    }

    pub fn contacts_in(&self, group: LocalId) -> impl Iterator<Item = &ContactRecord> {
        self.contacts.values().filter(move |c| c.group == group)
    }

    pub fn create_group(&mut self, uid: &str, title: &str) -> Result<Group, DataError> {
        if self.find_group(uid).is_some() {
            return Err(DataError::Rejected(format!("group {uid} already exists")));
        }
        let local_id = self.allocate_id();
        let record = GroupRecord {
            uid: uid.to_string(),
            local_id,
            title: title.to_string(),
        };
        let group = record.to_group();
        self.groups.push(record);
        Ok(group)
    }

    /// Returns `false` when the title was already `title`.
    pub fn update_group_title(&mut self, group: &Group, title: &str) -> Result<bool, DataError> {
        let record = self
            .groups
            .iter_mut()
            .find(|g| g.local_id == group.local_id)
            .ok_or_else(|| not_found("group", group.local_id))?;
        if record.title == title {
            return Ok(false);
        }
        record.title = title.to_string();
        Ok(true)
    }

    pub fn create_contact(
        &mut self,
        group: &Group,
        employee: &Employee,
        prefer_native: bool,
    ) -> Result<Contact, DataError> {
        if !self.groups.iter().any(|g| g.local_id == group.local_id) {
            return Err(not_found("group", group.local_id));
        }
        if self.find_contact(&employee.uid().0).is_some() {
            return Err(DataError::Rejected(format!(
                "contact for {} already exists",
                employee.uid()
            )));
        }
        let local_id = self.allocate_id();
        let record = ContactRecord::new(local_id, group.local_id, employee, prefer_native);
        let contact = record.to_contact();
        self.insert(record);
        Ok(contact)
    }

    /// Returns `false` when the record already matched `employee`.
    pub fn update_contact(
        &mut self,
        contact: &Contact,
        employee: &Employee,
        prefer_native: bool,
    ) -> Result<bool, DataError> {
        Ok(self
            .contact_mut(contact.local_id)?
            .apply(employee, prefer_native))
    }

    pub fn delete_contact(&mut self, contact: &Contact) -> Result<ContactRecord, DataError> {
        let record = self
            .contacts
            .remove(&contact.local_id)
            .ok_or_else(|| not_found("contact", contact.local_id))?;
        if self.by_uid.get(&record.uid) == Some(&record.local_id) {
            self.by_uid.remove(&record.uid);
        }
        Ok(record)
    }

    fn insert(&mut self, record: ContactRecord) {
        self.by_uid.insert(record.uid.clone(), record.local_id);
        self.contacts.insert(record.local_id, record);
    }

    fn allocate_id(&mut self) -> LocalId {
        self.next_id += 1;
        LocalId(self.next_id)
    }
}

fn not_found(kind: &'static str, id: LocalId) -> DataError {
    DataError::NotFound {
        kind,
        id: id.to_string(),
    }
}
