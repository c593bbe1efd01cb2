use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

static NEXT_FILE: AtomicUsize = AtomicUsize::new(0);

fn temp_path() -> PathBuf {
    let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("deskbook-store-{}-{n}.json", std::process::id()))
}

#[test]
fn memory_store_round_trips_pair() {
    let store = MemoryTokenStore::new();
    assert!(store.load().is_empty());

    store.save(&TokenPair::new("T1", "R1"));
    assert_eq!(store.access_token().as_deref(), Some("T1"));
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));

    store.clear();
    assert_eq!(store.load(), TokenPair::default());
}

#[test]
fn file_store_survives_reopen() {
    let path = temp_path();
    {
        let store = FileTokenStore::open(&path);
        store.save(&TokenPair::new("T1", "R1"));
    }
    let reopened = FileTokenStore::open(&path);
    assert_eq!(reopened.load(), TokenPair::new("T1", "R1"));

    reopened.clear();
    assert!(!path.exists());
}

#[test]
fn file_store_uses_fixed_keys() {
    let path = temp_path();
    let store = FileTokenStore::open(&path);
    store.save(&TokenPair::new("A", "B"));

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!({ "access_token": "A", "refresh_token": "B" }));

    store.clear();
}

#[test]
fn file_store_missing_file_starts_empty() {
    let store = FileTokenStore::open(temp_path());
    assert!(store.load().is_empty());
    store.clear();
}

#[test]
fn file_store_garbage_file_starts_empty() {
    let path = temp_path();
    std::fs::write(&path, b"not json").unwrap();
    let store = FileTokenStore::open(&path);
    assert!(store.load().is_empty());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn file_store_keeps_memory_copy_when_write_fails() {
    let dir = std::env::temp_dir().join(format!("deskbook-missing-dir-{}", std::process::id()));
    let store = FileTokenStore::open(dir.join("nested").join("tokens.json"));
    store.save(&TokenPair::new("T1", "R1"));
    assert_eq!(store.access_token().as_deref(), Some("T1"));
}
