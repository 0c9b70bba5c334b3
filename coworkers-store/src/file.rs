//! JSON-file contact store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.coworkers/
//!   store/<account>.json           (ledger: groups + contact records)
//!   photos/<account>/<local_id>.png
//! ```
//!
//! Every mutating call is one batch: the ledger change is applied in memory,
//! persisted with `.tmp` + rename, and rolled back if persisting fails.
//! Calls that leave the ledger as it was do not touch the file.
//! Photo writes are skipped when the SHA-256 of the new bytes matches the
//! recorded digest and the file is still present.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use coworkers_core::error::data_io_err;
use coworkers_core::{
    Contact, ContactPhoto, ContactStore, DataError, Employee, Group, LocalId,
};

use crate::ledger::{ContactRecord, Ledger};

/// `<home>/.coworkers/store/<account_key>.json`
pub fn store_path_at(home: &Path, account_key: &str) -> PathBuf {
    home.join(".coworkers")
        .join("store")
        .join(format!("{account_key}.json"))
}

/// `<home>/.coworkers/photos/<account_key>/`
pub fn photos_dir_at(home: &Path, account_key: &str) -> PathBuf {
    home.join(".coworkers").join("photos").join(account_key)
}

/// A [`ContactStore`] persisted as JSON on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    photos_dir: PathBuf,
    ledger: Ledger,
}

impl FileStore {
    /// Open (or start empty) the store for `account_key` under `home`.
    pub fn open_at(home: &Path, account_key: &str) -> Result<Self, DataError> {
        let path = store_path_at(home, account_key);
        let ledger = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| data_io_err(&path, e))?;
            serde_json::from_str(&contents).map_err(|e| DataError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            Ledger::default()
        };
        Ok(Self {
            path,
            photos_dir: photos_dir_at(home, account_key),
            ledger,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Path of the stored PNG for a contact.
    pub fn photo_path(&self, local_id: LocalId) -> PathBuf {
        self.photos_dir.join(format!("{local_id}.png"))
    }

    /// Apply `op` to the ledger and persist, restoring the previous ledger on
    /// any failure.
    fn commit<R>(
        &mut self,
        op: impl FnOnce(&mut Ledger) -> Result<R, DataError>,
    ) -> Result<R, DataError> {
        let snapshot = self.ledger.clone();
        let outcome = op(&mut self.ledger).and_then(|value| {
            self.persist()?;
            Ok(value)
        });
        if outcome.is_err() {
            self.ledger = snapshot;
        }
        outcome
    }

    fn persist(&self) -> Result<(), DataError> {
        let json = serde_json::to_string_pretty(&self.ledger).map_err(|e| DataError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&self.path, json.as_bytes())
    }

    /// Write photo bytes unless the digest shows they are already stored.
    /// Returns the digest of `bytes`.
    fn store_photo(&self, record: &ContactRecord, bytes: &[u8]) -> Result<String, DataError> {
        let digest = hex::encode(Sha256::digest(bytes));
        let path = self.photo_path(record.local_id);
        if record.photo_sha256.as_deref() == Some(digest.as_str()) && path.exists() {
            tracing::debug!("photo unchanged: {}", path.display());
            return Ok(digest);
        }
        write_atomic(&path, bytes)?;
        tracing::debug!("wrote photo: {}", path.display());
        Ok(digest)
    }

    fn remove_photo(&self, local_id: LocalId) -> Result<(), DataError> {
        let path = self.photo_path(local_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(data_io_err(path, err)),
        }
    }
}

impl ContactStore for FileStore {
    fn find_group_by_uid(&mut self, uid: &str) -> Result<Option<Group>, DataError> {
        Ok(self.ledger.find_group(uid).map(|g| g.to_group()))
    }

    fn create_group(&mut self, uid: &str, title: &str) -> Result<Group, DataError> {
        self.commit(|ledger| ledger.create_group(uid, title))
    }

    fn update_group_title(&mut self, group: &Group, title: &str) -> Result<(), DataError> {
        let current = self.ledger.find_group(&group.uid).map(|g| g.title.as_str());
        if current == Some(title) {
            return Ok(());
        }
        self.commit(|ledger| ledger.update_group_title(group, title).map(|_| ()))
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
        self.commit(|ledger| ledger.create_contact(group, employee, prefer_native_name))
    }

    fn update_contact(
        &mut self,
        contact: &Contact,
        employee: &Employee,
        prefer_native_name: bool,
    ) -> Result<(), DataError> {
        let record = self.ledger.contact(contact.local_id)?;
        if !record.differs_from(employee, prefer_native_name) {
            tracing::trace!("contact {} unchanged", contact.uid);
            return Ok(());
        }
        self.commit(|ledger| {
            ledger
                .update_contact(contact, employee, prefer_native_name)
                .map(|_| ())
        })
    }

    fn delete_contact(&mut self, contact: &Contact) -> Result<(), DataError> {
        self.commit(|ledger| ledger.delete_contact(contact).map(|_| ()))?;
        if let Err(err) = self.remove_photo(contact.local_id) {
            tracing::warn!("photo of removed contact {} left behind: {err}", contact.uid);
        }
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
        let record = self.ledger.contact(contact.local_id)?.clone();
        let digest = match bytes {
            Some(bytes) => Some(self.store_photo(&record, bytes)?),
            None => {
                self.remove_photo(record.local_id)?;
                None
            }
        };
        if record.photo.is_synced() && record.photo_sha256 == digest {
            return Ok(());
        }
        self.commit(|ledger| {
            let record = ledger.contact_mut(contact.local_id)?;
            record.photo_sha256 = digest;
            record.photo.mark_synced();
            Ok(())
        })
    }
}

/// `<path>.tmp` + rename, creating the parent directory first.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| data_io_err(dir, e))?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, bytes).map_err(|e| data_io_err(&tmp, e))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(data_io_err(path, err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn employee() -> Employee {
        Employee::new("e1", "Anton", "Grytsenko").with_photo_url(Some("http://x/p.png".into()))
    }

    #[test]
    fn empty_store_when_file_missing() {
        let home = TempDir::new().unwrap();
        let store = FileStore::open_at(home.path(), "nobody").unwrap();
        assert!(store.ledger().contacts().is_empty());
        assert!(!store_path_at(home.path(), "nobody").exists());
    }

    #[test]
    fn records_survive_reopen() {
        let home = TempDir::new().unwrap();
        let mut store = FileStore::open_at(home.path(), "anton").unwrap();
        let group = store.create_group("coworkers", "Coworkers").unwrap();
        let contact = store.create_contact(&group, &employee(), false).unwrap();

        let mut reopened = FileStore::open_at(home.path(), "anton").unwrap();
        let found = reopened.find_contact_by_uid("e1").unwrap().expect("persisted");
        assert_eq!(found, contact);
        assert_eq!(reopened.find_group_by_uid("coworkers").unwrap(), Some(group));
    }

    #[test]
    fn unchanged_records_do_not_rewrite_the_ledger() {
        let home = TempDir::new().unwrap();
        let mut store = FileStore::open_at(home.path(), "anton").unwrap();
        let group = store.create_group("coworkers", "Coworkers").unwrap();
        let contact = store.create_contact(&group, &employee(), false).unwrap();
        store.update_photo_bytes(&contact, Some(b"png")).unwrap();

        let path = store_path_at(home.path(), "anton");
        std::fs::remove_file(&path).unwrap();

        store.update_contact(&contact, &employee(), false).unwrap();
        store.update_group_title(&group, "Coworkers").unwrap();
        store.update_photo_bytes(&contact, Some(b"png")).unwrap();
        assert!(!path.exists(), "no-op calls must not persist");

        let renamed = Employee::new("e1", "Antin", "Grytsenko")
            .with_photo_url(Some("http://x/p.png".into()));
        store.update_contact(&contact, &renamed, false).unwrap();
        let reopened = FileStore::open_at(home.path(), "anton").unwrap();
        assert_eq!(reopened.ledger().find_contact("e1").unwrap().name.given, "Antin");
    }

    #[test]
    fn photo_bytes_written_and_hash_gated() {
        let home = TempDir::new().unwrap();
        let mut store = FileStore::open_at(home.path(), "anton").unwrap();
        let group = store.create_group("coworkers", "Coworkers").unwrap();
        let contact = store.create_contact(&group, &employee(), false).unwrap();

        store.update_photo_bytes(&contact, Some(b"png-bytes")).unwrap();
        let path = store.photo_path(contact.local_id);
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
        let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();

        store.update_photo_bytes(&contact, Some(b"png-bytes")).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), mtime);
        assert!(store.find_photo(&contact).unwrap().is_synced());

        store.update_photo_bytes(&contact, None).unwrap();
        assert!(!path.exists());
        assert!(store.ledger().contact(contact.local_id).unwrap().photo_sha256.is_none());
    }

    #[test]
    fn delete_removes_photo_file() {
        let home = TempDir::new().unwrap();
        let mut store = FileStore::open_at(home.path(), "anton").unwrap();
        let group = store.create_group("coworkers", "Coworkers").unwrap();
        let contact = store.create_contact(&group, &employee(), false).unwrap();
        store.update_photo_bytes(&contact, Some(b"png")).unwrap();

        store.delete_contact(&contact).unwrap();
        assert!(!store.photo_path(contact.local_id).exists());
        assert!(store.find_contact_by_uid("e1").unwrap().is_none());
    }

    #[test]
    fn corrupt_store_reports_path() {
        let home = TempDir::new().unwrap();
        let path = store_path_at(home.path(), "anton");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        let err = FileStore::open_at(home.path(), "anton").unwrap_err();
        assert!(matches!(err, DataError::Corrupt { .. }));
        assert!(err.to_string().contains("anton.json"));
    }

    #[test]
    #[cfg(unix)]
    fn failed_persist_rolls_back_ledger() {
        use std::os::unix::fs::PermissionsExt;

        let home = TempDir::new().unwrap();
        let mut store = FileStore::open_at(home.path(), "anton").unwrap();
        let group = store.create_group("coworkers", "Coworkers").unwrap();
        let before = store.ledger().clone();

        let dir = store_path_at(home.path(), "anton").parent().unwrap().to_path_buf();
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555)).unwrap();
        let result = store.create_contact(&group, &employee(), false);
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).unwrap();

        if result.is_ok() {
            // Running as root: permissions are not enforced.
            return;
        }
        assert_eq!(store.ledger(), &before);
    }
}
