//! Reconciliation scenarios: round-trip, deletion, update, idempotence,
//! keying completeness and failure isolation.

mod common;

use std::collections::BTreeMap;

use coworkers_core::{Contact, ContactStore, Employee, Group, PhotoSync, SyncStats, Uid};
use coworkers_store::MemoryStore;
use coworkers_sync::{
    CancellationToken, Interrupted, NetworkState, PhotoSyncer, Reconciler, StaticConnectivity,
};

use common::{set, FailingStore, ScriptedDirectory};

fn keys(map: &BTreeMap<Uid, Contact>) -> Vec<&str> {
    map.keys().map(|k| k.0.as_str()).collect()
}

fn group_of(store: &mut impl ContactStore) -> Group {
    store.create_group("coworkers", "Coworkers").unwrap()
}

fn reconcile<S: ContactStore>(
    store: &mut S,
    group: &Group,
    employees: Vec<Employee>,
) -> (BTreeMap<Uid, Contact>, SyncStats) {
    let contacts = Contact::map_by_uid(store.find_contacts_by_group(group).unwrap());
    let mut reconciler = Reconciler::new(store, group, false);
    let result = reconciler
        .reconcile(&Employee::map_by_uid(employees), contacts, &CancellationToken::new())
        .unwrap();
    (result, reconciler.stats())
}

#[test]
fn round_trip_creates_single_contact() {
    common::init_logging();
    let mut store = MemoryStore::new();
    let group = group_of(&mut store);

    let (result, stats) = reconcile(&mut store, &group, vec![Employee::new("e1", "A", "B")]);

    assert_eq!(stats, SyncStats { inserted: 1, ..SyncStats::default() });
    assert_eq!(keys(&result), ["e1"]);
}

#[test]
fn deletion_removes_contact() {
    let mut store = MemoryStore::new();
    let group = group_of(&mut store);
    store
        .create_contact(&group, &Employee::new("e1", "A", "B"), false)
        .unwrap();

    let (result, stats) = reconcile(&mut store, &group, Vec::new());

    assert_eq!(stats, SyncStats { deleted: 1, ..SyncStats::default() });
    assert!(result.is_empty());
    assert!(store.find_contact_by_uid("e1").unwrap().is_none());
}

#[test]
fn update_keeps_local_id() {
    let mut store = MemoryStore::new();
    let group = group_of(&mut store);
    let before = store
        .create_contact(&group, &Employee::new("e1", "A", "B"), false)
        .unwrap();

    let (result, stats) = reconcile(&mut store, &group, vec![Employee::new("e1", "A2", "B")]);

    assert_eq!(stats, SyncStats { updated: 1, ..SyncStats::default() });
    assert_eq!(result[&Uid::from("e1")].local_id, before.local_id);
    assert_eq!(store.record("e1").unwrap().name.given, "A2");
}

#[test]
fn second_pass_is_idempotent() {
    let mut store = MemoryStore::new();
    let group = group_of(&mut store);
    let employees = || {
        vec![
            Employee::new("e1", "A", "B"),
            Employee::new("e2", "C", "D").with_email(Some("c@example.com".into())),
        ]
    };

    let (first, _) = reconcile(&mut store, &group, employees());
    let (second, stats) = reconcile(&mut store, &group, employees());

    assert_eq!(first, second);
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.deleted, 0);
    assert_eq!(stats.updated, 2);
}

#[test]
fn result_keys_match_employees_when_nothing_fails() {
    let mut store = MemoryStore::new();
    let group = group_of(&mut store);
    for uid in ["old1", "keep", "old2"] {
        store
            .create_contact(&group, &Employee::new(uid, "X", "Y"), false)
            .unwrap();
    }
    let employees = vec![
        Employee::new("keep", "X", "Y"),
        Employee::new("new1", "X", "Y"),
        Employee::new("new2", "X", "Y"),
    ];

    let (result, stats) = reconcile(&mut store, &group, employees);

    assert_eq!(keys(&result), ["keep", "new1", "new2"]);
    assert_eq!(stats.skipped, 0);
}

#[test]
fn duplicate_uid_in_payload_is_last_write_wins() {
    let mut store = MemoryStore::new();
    let group = group_of(&mut store);

    let (result, stats) = reconcile(
        &mut store,
        &group,
        vec![Employee::new("e1", "First", "B"), Employee::new("e1", "Second", "B")],
    );

    assert_eq!(keys(&result), ["e1"]);
    assert_eq!(stats.inserted, 1);
    assert_eq!(store.record("e1").unwrap().name.given, "Second");
}

#[test]
fn one_failure_per_operation_is_isolated() {
    common::init_logging();
    let mut store = FailingStore {
        fail_create: set(&["new-bad"]),
        fail_update: set(&["keep-bad"]),
        fail_delete: set(&["old-bad"]),
        ..FailingStore::default()
    };
    let group = group_of(&mut store);
    for uid in ["keep-ok", "keep-bad", "old-ok", "old-bad"] {
        store
            .inner
            .create_contact(&group, &Employee::new(uid, "X", "Y"), false)
            .unwrap();
    }
    let employees = vec![
        Employee::new("keep-ok", "X2", "Y"),
        Employee::new("keep-bad", "X2", "Y"),
        Employee::new("new-ok", "X", "Y"),
        Employee::new("new-bad", "X", "Y"),
    ];

    let (result, stats) = reconcile(&mut store, &group, employees);

    assert_eq!(
        stats,
        SyncStats {
            inserted: 1,
            updated: 1,
            deleted: 1,
            skipped: 3
        }
    );
    // Previous set plus successful creates minus successful deletes.
    assert_eq!(keys(&result), ["keep-bad", "keep-ok", "new-ok", "old-bad"]);
    assert_eq!(store.inner.record("keep-ok").unwrap().name.given, "X2");
    assert_eq!(store.inner.record("keep-bad").unwrap().name.given, "X");
}

#[test]
fn photo_url_change_marks_photo_stale() {
    let mut store = MemoryStore::new();
    let group = group_of(&mut store);
    let with_url = |url: &str| Employee::new("e1", "A", "B").with_photo_url(Some(url.into()));
    let contact = store
        .create_contact(&group, &with_url("http://x/p.png"), false)
        .unwrap();
    store.update_photo_bytes(&contact, Some(b"png")).unwrap();

    reconcile(&mut store, &group, vec![with_url("http://x/p.png")]);
    assert!(store.find_photo(&contact).unwrap().is_synced());

    reconcile(&mut store, &group, vec![with_url("http://x/q.png")]);
    let photo = store.find_photo(&contact).unwrap();
    assert!(!photo.is_synced());
    assert_eq!(photo.url(), Some("http://x/q.png"));

    reconcile(&mut store, &group, vec![Employee::new("e1", "A", "B")]);
    assert_eq!(store.find_photo(&contact).unwrap().url(), None);
}

#[test]
fn cancellation_between_creates_keeps_committed_records() {
    let cancel = CancellationToken::new();
    let mut store = FailingStore {
        cancel_after_create: Some(cancel.clone()),
        ..FailingStore::default()
    };
    let group = group_of(&mut store);
    let employees = Employee::map_by_uid(vec![
        Employee::new("e1", "A", "B"),
        Employee::new("e2", "C", "D"),
    ]);

    let mut reconciler = Reconciler::new(&mut store, &group, false);
    let result = reconciler.reconcile(&employees, BTreeMap::new(), &cancel);

    assert_eq!(result, Err(Interrupted));
    assert_eq!(reconciler.stats(), SyncStats { inserted: 1, ..SyncStats::default() });
    assert!(store.find_contact_by_uid("e1").unwrap().is_some());
    assert!(store.find_contact_by_uid("e2").unwrap().is_none());
}

#[test]
fn cancellation_between_photos_keeps_downloaded_ones() {
    let cancel = CancellationToken::new();
    let mut store = MemoryStore::new();
    let group = group_of(&mut store);
    let with_photo = |uid: &str| {
        Employee::new(uid, "A", "B").with_photo_url(Some(format!("http://x/{uid}.png")))
    };
    for uid in ["e1", "e2"] {
        store.create_contact(&group, &with_photo(uid), false).unwrap();
    }
    let contacts = Contact::map_by_uid(store.find_contacts_by_group(&group).unwrap());
    let directory = ScriptedDirectory {
        cancel_after_photo: Some(cancel.clone()),
        ..ScriptedDirectory::default()
    };
    let connectivity = StaticConnectivity(NetworkState::Unmetered);

    let mut syncer = PhotoSyncer::new(&mut store, &directory, &connectivity, PhotoSync::Any);
    let result = syncer.sync(&contacts, &cancel);

    assert_eq!(result, Err(Interrupted));
    assert_eq!(syncer.stats().downloaded, 1);
    assert_eq!(directory.photo_requests.borrow().as_slice(), ["http://x/e1.png"]);
    assert!(store.find_photo(&contacts[&Uid::from("e1")]).unwrap().is_synced());
    assert!(!store.find_photo(&contacts[&Uid::from("e2")]).unwrap().is_synced());
}
