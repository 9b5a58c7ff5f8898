use content_router_engine::store::file::JsonFileStore;
use content_router_engine::store::traits::{KeyValueStore, StoredValue};

#[test]
fn test_json_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("router").join("state.json");

    {
        let store = JsonFileStore::open(&path).unwrap();
        store.set_string("saved_content_source", "https://cdn.example/page");
        store.set_bool("primary_mode_shown", true);
        store.set_int("enhanced_access_count", 2);
    }

    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(
        reopened.get_string("saved_content_source").as_deref(),
        Some("https://cdn.example/page")
    );
    assert!(reopened.get_bool("primary_mode_shown"));
    assert_eq!(reopened.get_int("enhanced_access_count"), 2);
    assert_eq!(reopened.get("missing"), None);
}

#[test]
fn test_json_store_remove_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = JsonFileStore::open(&path).unwrap();
    store.set("classic_path_id", StoredValue::Text("9".to_string()));
    store.remove("classic_path_id");
    drop(store);

    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.get_string("classic_path_id"), None);
}

#[test]
fn test_json_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(JsonFileStore::open(&path).is_err());
}

#[test]
fn test_json_store_empty_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "").unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    assert!(!store.get_bool("dropbox_failed_once"));
}
