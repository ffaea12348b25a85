use chrono::{Duration, TimeZone, Utc};
use keywarden_lifecycle::RecordStore;
use keywarden_types::{KeyKind, KeyRecord};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn sample_records() -> Vec<KeyRecord> {
    let created = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
    vec![
        KeyRecord::permanent("KEY-PERM", created),
        KeyRecord::temporary("KEY-TEMP", created, created + Duration::minutes(30)),
    ]
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let store = RecordStore::open(dir.path().join("keys.json"));

    let records = sample_records();
    store.save(&records).unwrap();

    assert_eq!(store.load(), records);
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempdir().unwrap();
    let store = RecordStore::open(dir.path().join("keys.json"));

    assert!(store.load().is_empty());
}

#[test]
fn corrupt_document_loads_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = RecordStore::open(&path);
    assert!(store.load().is_empty());
}

#[test]
fn corrupt_document_is_replaced_by_next_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(&path, "garbage").unwrap();

    let store = RecordStore::open(&path);
    let records = sample_records();
    store.save(&records).unwrap();

    assert_eq!(store.load(), records);
}

#[test]
fn invalid_records_are_skipped_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.json");
    // A permanent record must not carry an expiry; the valid record after
    // it still loads.
    std::fs::write(
        &path,
        r#"{
            "keys": [
                {
                    "key": "KEY-BAD",
                    "type": "permanent",
                    "created": "2026-01-10T12:00:00Z",
                    "expiresAt": "2026-01-10T13:00:00Z"
                },
                {
                    "key": "KEY-GOOD",
                    "type": "permanent",
                    "created": "2026-01-10T12:00:00Z"
                }
            ]
        }"#,
    )
    .unwrap();

    let store = RecordStore::open(&path);
    let loaded = store.load();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].key, "KEY-GOOD");
}

#[test]
fn unknown_document_fields_are_dropped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(
        &path,
        r#"{
            "version": 3,
            "keys": [
                {
                    "key": "KEY-0001",
                    "type": "temporary",
                    "created": "2026-01-10T12:00:00Z",
                    "expiresAt": "2026-01-10T12:30:00Z",
                    "expiresInMinutes": 30
                }
            ]
        }"#,
    )
    .unwrap();

    let store = RecordStore::open(&path);
    let loaded = store.load();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].kind, KeyKind::Temporary);
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.json");
    let store = RecordStore::open(&path);

    store.save(&sample_records()).unwrap();

    assert!(path.exists());
    assert!(!dir.path().join("keys.json.tmp").exists());
}

#[test]
fn empty_save_writes_an_empty_document() {
    let dir = tempdir().unwrap();
    let store = RecordStore::open(dir.path().join("keys.json"));

    store.save(&sample_records()).unwrap();
    store.save(&[]).unwrap();

    assert!(store.load().is_empty());
}
