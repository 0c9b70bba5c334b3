//! Domain types shared by the directory client, the stores and the sync engine.
//!
//! Employees come from the remote directory and are immutable once parsed.
//! Contacts, photos and groups are projections of records owned by a
//! [`ContactStore`](crate::ContactStore); the sync engine only holds them for
//! the duration of one pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of the single group this integration maintains per account.
pub const GROUP_UID: &str = "coworkers";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Globally unique, run-stable identifier of an employee.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(pub String);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque handle assigned by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Employee
// ---------------------------------------------------------------------------

/// Given and family name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub given: String,
    pub family: String,
}

impl PersonName {
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.given.is_empty() && !self.family.is_empty()
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.given, self.family)
    }
}

/// An authoritative record from the remote directory.
///
/// Built with [`Employee::new`] plus the `with_*` methods; there are no
/// setters, so a parsed employee cannot change during a pass. The native
/// name is stored as one [`PersonName`], which keeps both halves present or
/// both absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    uid: Uid,
    name: PersonName,
    native_name: Option<PersonName>,
    position: Option<String>,
    email: Option<String>,
    mobile: Option<String>,
    skype: Option<String>,
    photo_url: Option<String>,
}

impl Employee {
    pub fn new(uid: impl Into<Uid>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: PersonName::new(first_name, last_name),
            native_name: None,
            position: None,
            email: None,
            mobile: None,
            skype: None,
            photo_url: None,
        }
    }

    pub fn with_native_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.native_name = Some(PersonName::new(first_name, last_name));
        self
    }

    pub fn with_position(mut self, position: Option<String>) -> Self {
        self.position = position;
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn with_mobile(mut self, mobile: Option<String>) -> Self {
        self.mobile = mobile;
        self
    }

    pub fn with_skype(mut self, skype: Option<String>) -> Self {
        self.skype = skype;
        self
    }

    pub fn with_photo_url(mut self, photo_url: Option<String>) -> Self {
        self.photo_url = normalize_url(photo_url);
        self
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn name(&self) -> &PersonName {
        &self.name
    }

    pub fn native_name(&self) -> Option<&PersonName> {
        self.native_name.as_ref()
    }

    /// Name written to the contact: the native pair when preferred and
    /// complete, otherwise the Latin pair.
    pub fn display_name(&self, prefer_native: bool) -> &PersonName {
        match &self.native_name {
            Some(native) if prefer_native && native.is_complete() => native,
            _ => &self.name,
        }
    }

    pub fn position(&self) -> Option<&str> {
        self.position.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn mobile(&self) -> Option<&str> {
        self.mobile.as_deref()
    }

    pub fn skype(&self) -> Option<&str> {
        self.skype.as_deref()
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    /// Keys a parsed list by uid. Duplicate uids resolve last-write-wins.
    pub fn map_by_uid(employees: Vec<Employee>) -> BTreeMap<Uid, Employee> {
        employees
            .into_iter()
            .map(|employee| (employee.uid.clone(), employee))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Contact, photo, group
// ---------------------------------------------------------------------------

/// A local record materialized for exactly one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub uid: Uid,
    pub local_id: LocalId,
}

impl Contact {
    pub fn new(uid: impl Into<Uid>, local_id: LocalId) -> Self {
        Self {
            uid: uid.into(),
            local_id,
        }
    }

    pub fn map_by_uid(contacts: Vec<Contact>) -> BTreeMap<Uid, Contact> {
        contacts
            .into_iter()
            .map(|contact| (contact.uid.clone(), contact))
            .collect()
    }
}

/// Photo sub-record of a contact.
///
/// `synced` is true only when the stored bytes came from the current `url`.
/// [`ContactPhoto::update`] is the only way to change the URL, and it resets
/// `synced` whenever the URL actually changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactPhoto {
    url: Option<String>,
    synced: bool,
}

impl ContactPhoto {
    pub fn new(url: Option<String>, synced: bool) -> Self {
        Self {
            url: normalize_url(url),
            synced,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Points the photo at `new_url`; a different URL (including a switch
    /// to or from none) marks the stored bytes stale.
    pub fn update(&mut self, new_url: Option<&str>) {
        let new_url = normalize_url(new_url.map(str::to_owned));
        if self.url != new_url {
            self.synced = false;
        }
        self.url = new_url;
    }

    /// Records that the bytes for the current URL were just stored.
    pub fn mark_synced(&mut self) {
        self.synced = true;
    }
}

/// The container scoping which local contacts belong to this integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub uid: String,
    pub local_id: LocalId,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters for one reconciliation pass. Never persisted across runs except
/// as part of a finished run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(Uid::from("e1").to_string(), "e1");
        assert_eq!(LocalId(42).to_string(), "42");
    }

    #[test]
    fn display_name_prefers_native_only_when_complete() {
        let employee = Employee::new("e1", "Anton", "Grytsenko").with_native_name("Антон", "Гриценко");
        assert_eq!(employee.display_name(true).given, "Антон");
        assert_eq!(employee.display_name(false).given, "Anton");

        let partial = Employee::new("e2", "Ivan", "Petrenko").with_native_name("", "Петренко");
        assert_eq!(partial.display_name(true).given, "Ivan");
    }

    #[test]
    fn map_by_uid_keeps_last_duplicate() {
        let employees = vec![
            Employee::new("e1", "A", "B"),
            Employee::new("e1", "A2", "B2"),
            Employee::new("e2", "C", "D"),
        ];
        let keyed = Employee::map_by_uid(employees);
        assert_eq!(keyed.len(), 2);
        assert_eq!(keyed[&Uid::from("e1")].name().given, "A2");
    }

    #[test]
    fn photo_update_with_same_url_keeps_synced() {
        let mut photo = ContactPhoto::new(Some("http://x/p.png".into()), true);
        photo.update(Some("http://x/p.png"));
        assert!(photo.is_synced());
    }

    #[test]
    fn photo_update_with_new_url_resets_synced() {
        let mut photo = ContactPhoto::new(Some("http://x/p.png".into()), true);
        photo.update(Some("http://x/q.png"));
        assert!(!photo.is_synced());
        assert_eq!(photo.url(), Some("http://x/q.png"));
    }

    #[test]
    fn photo_update_to_and_from_none_resets_synced() {
        let mut photo = ContactPhoto::new(Some("http://x/p.png".into()), true);
        photo.update(None);
        assert!(!photo.is_synced());
        assert_eq!(photo.url(), None);

        photo.mark_synced();
        photo.update(Some("http://x/p.png"));
        assert!(!photo.is_synced());
    }

    #[test]
    fn empty_url_is_treated_as_absent() {
        let mut photo = ContactPhoto::new(Some(String::new()), true);
        assert_eq!(photo.url(), None);
        photo.update(Some("  "));
        assert!(photo.is_synced(), "blank and absent are the same url");
    }
}
