//! Tests for StateManager

use super::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use tempfile::tempdir;

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_new() {
    let manager = StateManager::new("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
    assert_eq!(manager.path().to_str().unwrap(), "/tmp/test-state.json");
}

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
}

#[tokio::test]
async fn test_from_file_missing_starts_empty() {
    let dir = tempdir().unwrap();
    let manager = StateManager::from_file(dir.path().join("state.json"));

    assert!(!manager.is_in_memory());
    assert_eq!(manager.load_cursor("nbtc", 1_628_277).await, 1_628_277);
    assert!(manager.known_names("nbtc").await.is_empty());
}

#[tokio::test]
async fn test_from_file_corrupt_starts_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();

    let manager = StateManager::from_file(&path);
    assert_eq!(manager.load_cursor("nbtc", 77).await, 77);
}

#[tokio::test]
async fn test_from_file_legacy_bare_integer_is_next_id() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".last_id");
    std::fs::write(&path, "1628300\n").unwrap();

    let manager = StateManager::from_file(&path);
    let cursor = manager.load_cursor(DEFAULT_SCAN, 0).await;
    assert_eq!(cursor, 1_628_299);
    assert_eq!(cursor + 1, 1_628_300);
    assert_eq!(manager.load_cursor("other", 5).await, 5);
}

#[tokio::test]
async fn test_open_loads_legacy_files_into_named_scan() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".last_id");
    std::fs::write(&path, "1628300").unwrap();
    std::fs::write(
        dir.path().join("known.json"),
        r#"["Galaxy S25", "OPPO Find X8"]"#,
    )
    .unwrap();

    let manager = StateManager::open(&path, "mocheck");

    assert_eq!(manager.load_cursor("mocheck", 0).await, 1_628_299);
    assert_eq!(manager.load_cursor(DEFAULT_SCAN, 7).await, 7);
    assert_eq!(
        manager.known_names("mocheck").await,
        BTreeSet::from(["Galaxy S25".to_string(), "OPPO Find X8".to_string()])
    );
}

#[tokio::test]
async fn test_open_ignores_unreadable_known_list() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".last_id");
    std::fs::write(&path, "10").unwrap();
    std::fs::write(dir.path().join("known.json"), "{ broken").unwrap();

    let manager = StateManager::open(&path, "nbtc");
    assert_eq!(manager.load_cursor("nbtc", 0).await, 9);
    assert!(manager.known_names("nbtc").await.is_empty());
}

#[tokio::test]
async fn test_open_current_layout_ignores_known_list() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{"scans": {"nbtc": {"last_processed_id": 50, "known_names": ["A"]}}}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("known.json"), r#"["B"]"#).unwrap();

    let manager = StateManager::open(&path, "nbtc");
    assert_eq!(manager.load_cursor("nbtc", 0).await, 50);
    assert_eq!(
        manager.known_names("nbtc").await,
        BTreeSet::from(["A".to_string()])
    );
}

#[tokio::test]
async fn test_from_file_legacy_last_id_object() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, r#"{"last_id": 1624970}"#).unwrap();

    let manager = StateManager::from_file(&path);
    assert_eq!(manager.load_cursor(DEFAULT_SCAN, 0).await, 1_624_970);
}

#[test]
fn test_from_json_invalid_is_state_error() {
    let err = StateManager::from_json("\"nope\"").unwrap_err();
    assert!(err.is_state_error());
}

// ============================================================================
// Cursor Tests
// ============================================================================

#[tokio::test]
async fn test_record_merges_names_and_advances() {
    let manager = StateManager::in_memory();

    manager
        .record("nbtc", 1010, &["Galaxy".to_string()])
        .await;
    manager
        .record("nbtc", 1020, &["Pixel".to_string(), "Galaxy".to_string()])
        .await;

    assert_eq!(manager.load_cursor("nbtc", 0).await, 1020);
    assert_eq!(
        manager.known_names("nbtc").await,
        BTreeSet::from(["Galaxy".to_string(), "Pixel".to_string()])
    );
    assert!(manager.scan_state("nbtc").await.unwrap().updated_at.is_some());
}

#[tokio::test]
async fn test_record_never_rewinds() {
    let manager = StateManager::in_memory();

    manager.record("nbtc", 500, &[]).await;
    manager.record("nbtc", 400, &[]).await;

    assert_eq!(manager.load_cursor("nbtc", 0).await, 500);
}

#[tokio::test]
async fn test_set_cursor_can_rewind() {
    let manager = StateManager::in_memory();

    manager.record("nbtc", 500, &[]).await;
    manager.set_cursor("nbtc", 100).await;

    assert_eq!(manager.load_cursor("nbtc", 0).await, 100);
}

#[tokio::test]
async fn test_scans_are_independent() {
    let manager = StateManager::in_memory();

    manager.record("nbtc", 10, &["A".to_string()]).await;
    manager.record("staging", 99, &[]).await;

    assert_eq!(manager.load_cursor("nbtc", 0).await, 10);
    assert_eq!(manager.load_cursor("staging", 0).await, 99);
    assert!(manager.known_names("staging").await.is_empty());
}

#[tokio::test]
async fn test_reset() {
    let manager = StateManager::in_memory();
    manager.record("nbtc", 10, &["A".to_string()]).await;

    assert!(manager.reset("nbtc").await);
    assert!(!manager.reset("nbtc").await);
    assert_eq!(manager.load_cursor("nbtc", 3).await, 3);
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::from_file(&path);
    manager
        .record("nbtc", 1_628_300, &["Galaxy S25".to_string()])
        .await;
    manager.save().await.unwrap();

    assert!(path.exists());
    assert!(!dir.path().join("state.tmp").exists());

    let reloaded = StateManager::from_file(&path);
    assert_eq!(reloaded.load_cursor("nbtc", 0).await, 1_628_300);
    assert_eq!(
        reloaded.known_names("nbtc").await,
        BTreeSet::from(["Galaxy S25".to_string()])
    );
}

#[tokio::test]
async fn test_save_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::new(&path);
    manager.set_cursor("nbtc", 42).await;
    manager.save().await.unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["scans"]["nbtc"]["last_processed_id"], 42);
    assert_eq!(json["scans"]["nbtc"]["known_names"], serde_json::json!([]));
}

#[tokio::test]
async fn test_save_overwrites_legacy_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "12").unwrap();

    let manager = StateManager::from_file(&path);
    manager.record(DEFAULT_SCAN, 20, &[]).await;
    manager.save().await.unwrap();

    let reloaded = StateManager::from_file(&path);
    assert_eq!(reloaded.load_cursor(DEFAULT_SCAN, 0).await, 20);
}

#[tokio::test]
async fn test_save_failure_is_state_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("state.json");

    let manager = StateManager::new(&path);
    manager.record("nbtc", 1, &[]).await;

    let err = manager.save().await.unwrap_err();
    assert!(err.is_state_error());
}

#[tokio::test]
async fn test_in_memory_save_is_noop() {
    let manager = StateManager::in_memory();
    manager.record("nbtc", 1, &[]).await;
    manager.save().await.unwrap();
}

#[tokio::test]
async fn test_clone_shares_state() {
    let manager = StateManager::in_memory();
    let clone = manager.clone();

    clone.record("nbtc", 9, &[]).await;
    assert_eq!(manager.load_cursor("nbtc", 0).await, 9);
}
