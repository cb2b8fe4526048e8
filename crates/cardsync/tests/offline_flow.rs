//! End-to-end flows over the filesystem store and the directory remote.

use cardsync::connectivity::ManualConnectivity;
use cardsync::model::{is_pending_id, ContactFields, FieldValue, NewContact};
use cardsync::remote::dir::DirRemote;
use cardsync::remote::RemoteStore;
use cardsync::store::fs::FileCardStore;
use cardsync::store::LocalStore;
use cardsync::{CardError, CardsApi, DrainOutcome, NotSyncedReason, SyncEngine};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

struct Device {
    _temp: TempDir,
    local: Arc<FileCardStore>,
    remote: Arc<DirRemote>,
    conn: Arc<ManualConnectivity>,
    api: CardsApi<FileCardStore, DirRemote>,
    engine: Arc<SyncEngine<FileCardStore, DirRemote>>,
}

fn device(connected: bool) -> Device {
    let temp = TempDir::new().unwrap();
    let remote_dir = temp.path().join("remote");
    fs::create_dir_all(&remote_dir).unwrap();

    let local = Arc::new(FileCardStore::new(temp.path().join("data")));
    let remote = Arc::new(DirRemote::new(remote_dir));
    let conn = Arc::new(ManualConnectivity::new(connected));
    let api = CardsApi::new(Arc::clone(&local), Arc::clone(&remote), conn.clone());
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&local),
        Arc::clone(&remote),
        conn.clone(),
    ));
    engine.watch(conn.as_ref());

    Device {
        _temp: temp,
        local,
        remote,
        conn,
        api,
        engine,
    }
}

fn jane() -> NewContact {
    NewContact::new(ContactFields {
        name: "Jane Doe".into(),
        company: "Acme".into(),
        phone: "+1 (555) 123-4567".into(),
        ..Default::default()
    })
}

#[test]
fn test_offline_capture_syncs_on_reconnect() {
    let dev = device(false);

    let outcome = dev.api.save("u1", jane()).unwrap();
    assert!(!outcome.is_synced());
    let pending_id = outcome.record.id.clone();
    assert!(is_pending_id(&pending_id));

    let listed = dev.api.list("u1").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].fields.name.as_str(), Some("Jane Doe"));

    // reconnect fires the drain through the watch subscription
    dev.conn.set_connected(true);

    assert_eq!(dev.api.pending_count("u1").unwrap(), 0);
    let remote_records = dev.remote.list("u1").unwrap();
    assert_eq!(remote_records.len(), 1);
    assert!(!remote_records[0].is_pending());
    assert_eq!(remote_records[0].timestamp, outcome.record.timestamp);

    let listed = dev.api.list("u1").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, remote_records[0].id);
    assert!(dev
        .local
        .get_cached("u1")
        .unwrap()
        .iter()
        .all(|r| r.id != pending_id));
}

#[test]
fn test_edit_while_pending_is_what_gets_uploaded() {
    let dev = device(false);
    let mut record = dev.api.save("u1", jane()).unwrap().record;

    record.fields.title = "VP Sales".into();
    record.fields.company = FieldValue::Null;
    let err = dev.api.update("u1", &record).unwrap_err();
    assert!(matches!(
        err,
        CardError::NotSynced {
            reason: NotSyncedReason::PendingCreate,
            ..
        }
    ));

    dev.conn.set_connected(true);
    let uploaded = &dev.remote.list("u1").unwrap()[0];
    assert_eq!(uploaded.fields.title.as_str(), Some("VP Sales"));
    assert_eq!(uploaded.fields.company, FieldValue::Null);
}

#[test]
fn test_discarding_pending_record_never_uploads() {
    let dev = device(false);
    let record = dev.api.save("u1", jane()).unwrap().record;
    dev.api.delete("u1", &record.id).unwrap();

    dev.conn.set_connected(true);
    assert!(dev.remote.list("u1").unwrap().is_empty());
    assert!(dev.api.list("u1").unwrap().is_empty());
}

#[test]
fn test_unmounted_share_queues_and_recovers() {
    let dev = device(true);
    let share = dev.remote.root().unwrap().to_path_buf();
    fs::remove_dir_all(&share).unwrap();

    // connectivity says yes, but the remote fails: save still succeeds locally
    let outcome = dev.api.save("u1", jane()).unwrap();
    assert!(!outcome.is_synced());
    assert_eq!(dev.api.list("u1").unwrap().len(), 1);

    fs::create_dir_all(&share).unwrap();
    match dev.engine.trigger_drain().unwrap() {
        DrainOutcome::Completed(report) => assert_eq!(report.synced.len(), 1),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(dev.remote.list("u1").unwrap().len(), 1);
}

#[test]
fn test_duplicate_check_works_offline() {
    let dev = device(true);
    dev.api.save("u1", jane()).unwrap();
    dev.conn.set_connected(false);

    let candidate = ContactFields {
        name: "Someone Else".into(),
        mobile: "555.123.4567".into(),
        ..Default::default()
    };
    let dupes = dev.api.check_for_duplicates("u1", &candidate).unwrap();
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes[0].fields.name.as_str(), Some("Jane Doe"));
}

#[test]
fn test_owners_do_not_see_each_other() {
    let dev = device(false);
    dev.api.save("alice", jane()).unwrap();
    dev.api.save("bob", jane()).unwrap();
    dev.conn.set_connected(true);

    assert_eq!(dev.api.list("alice").unwrap().len(), 1);
    assert_eq!(dev.api.list("bob").unwrap().len(), 1);
    assert_eq!(dev.remote.list("alice").unwrap()[0].owner_id, "alice");
}
