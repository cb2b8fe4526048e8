use cardsync::model::{ContactFields, ContactRecord, NewContact};
use cardsync::store::backend::StorageBackend;
use cardsync::store::fs::FileCardStore;
use cardsync::store::fs_backend::{FsBackend, CACHE_FILE, PENDING_FILE};
use cardsync::store::LocalStore;
use cardsync::CardError;
use std::fs;
use tempfile::TempDir;

fn contact(name: &str) -> NewContact {
    NewContact::new(ContactFields {
        name: name.into(),
        ..Default::default()
    })
    .stamped()
}

fn assert_no_tmp_files(dir: &std::path::Path) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(!name.ends_with(".tmp"), "Found leftover tmp file: {}", name);
    }
}

#[test]
fn test_missing_files_read_as_empty_tables() {
    let dir = TempDir::new().unwrap();
    let backend = FsBackend::new(dir.path().join("not-yet-created"));

    assert!(backend.load_cache().unwrap().is_empty());
    assert!(backend.load_pending().unwrap().is_empty());
}

#[test]
fn test_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let pending_id;
    {
        let store = FileCardStore::new(dir.path());
        let write = store.enqueue_pending("u1", &contact("Queued")).unwrap();
        store.cache_one(&write.placeholder()).unwrap();
        store
            .cache_one(&ContactRecord::from_new("c1", "u1", &contact("Confirmed")))
            .unwrap();
        pending_id = write.id;
    }

    let reopened = FileCardStore::new(dir.path());
    let cached = reopened.get_cached("u1").unwrap();
    assert_eq!(cached.len(), 2);
    let pending = reopened.list_pending(None).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, pending_id);
    assert_eq!(reopened.data_dir(), dir.path());
}

#[test]
fn test_writes_are_atomic() {
    let dir = TempDir::new().unwrap();
    let store = FileCardStore::new(dir.path());

    store.enqueue_pending("u1", &contact("A")).unwrap();
    store
        .cache_one(&ContactRecord::from_new("c1", "u1", &contact("B")))
        .unwrap();

    assert!(dir.path().join(CACHE_FILE).exists());
    assert!(dir.path().join(PENDING_FILE).exists());
    assert_no_tmp_files(dir.path());
}

#[test]
fn test_malformed_timestamp_on_disk_reads_as_now() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CACHE_FILE),
        r#"{
            "r1": {"id": "r1", "owner_id": "u1", "name": "Jane", "timestamp": "not a date"},
            "r2": {"id": "r2", "owner_id": "u1", "name": "John", "timestamp": 1705314600000}
        }"#,
    )
    .unwrap();

    let store = FileCardStore::new(dir.path());
    let cached = store.get_cached("u1").unwrap();
    assert_eq!(cached.len(), 2);
    // "now" sorts ahead of the 2024 timestamp
    assert_eq!(cached[0].id, "r1");
    assert_eq!(cached[1].timestamp.timestamp_millis(), 1705314600000);
}

#[test]
fn test_corrupted_table_is_storage_unavailable() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(PENDING_FILE), "[{ broken").unwrap();

    let store = FileCardStore::new(dir.path());
    assert!(matches!(
        store.list_pending(None),
        Err(CardError::LocalStorageUnavailable(_))
    ));
}

#[test]
fn test_empty_file_reads_as_empty_table() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CACHE_FILE), "  \n").unwrap();

    let store = FileCardStore::new(dir.path());
    assert!(store.get_cached("u1").unwrap().is_empty());
}

#[test]
fn test_explicit_nulls_survive_disk_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = FileCardStore::new(dir.path());
    let mut record = ContactRecord::from_new("c1", "u1", &contact("Jane"));
    record.fields.email = cardsync::model::FieldValue::Null;
    store.cache_one(&record).unwrap();

    let on_disk = fs::read_to_string(dir.path().join(CACHE_FILE)).unwrap();
    assert!(on_disk.contains("\"email\": null"));
    assert!(!on_disk.contains("\"phone\""));

    let cached = FileCardStore::new(dir.path()).get_cached("u1").unwrap();
    assert_eq!(cached[0].fields.email, cardsync::model::FieldValue::Null);
}
