//! Tests for the document snapshot worker and snapshot loading.

mod common;

use std::sync::Arc;

use common::MockStorage;
use gov_portal_server::document::persistence::{
    load_snapshot, persistence_channel, start_persistence_worker, SNAPSHOT_FILE,
};
use gov_portal_server::document::{DocumentStore, Snapshot};
use gov_portal_server::storage::ObjectStorage;
use serde_json::json;
use tokio::time::{sleep, Duration};

fn spawn_worker(storage: Arc<MockStorage>) -> (DocumentStore, tokio::task::JoinHandle<()>) {
    let (sender, receiver) = persistence_channel();
    let store = DocumentStore::new().with_persistence(sender);
    let worker_store = store.clone();
    let handle = tokio::spawn(async move {
        start_persistence_worker(receiver, worker_store, storage).await;
    });
    (store, handle)
}

async fn persisted(storage: &MockStorage) -> Snapshot {
    let bytes = storage.file(SNAPSHOT_FILE).await.expect("snapshot uploaded");
    serde_json::from_slice(&bytes).expect("snapshot is JSON")
}

#[tokio::test]
async fn test_store_write_is_persisted() {
    let storage = Arc::new(MockStorage::new());
    let (store, handle) = spawn_worker(storage.clone());

    store
        .collection("tags")
        .insert(&json!({"_id": "t1", "en": {"name": "Health", "lang": "en"}}))
        .unwrap();
    sleep(Duration::from_millis(700)).await;

    assert_eq!(storage.upload_count(), 1);
    let snapshot = persisted(&storage).await;
    assert_eq!(snapshot["tags"].len(), 1);
    assert_eq!(snapshot["tags"][0]["_id"], "t1");

    drop(store);
    handle.abort();
}

#[tokio::test]
async fn test_rapid_writes_are_debounced() {
    let storage = Arc::new(MockStorage::new());
    let (store, handle) = spawn_worker(storage.clone());

    let tags = store.collection("tags");
    for i in 1..=5 {
        tags.insert(&json!({"_id": format!("t{}", i)})).unwrap();
        sleep(Duration::from_millis(50)).await;
    }
    sleep(Duration::from_millis(800)).await;

    assert_eq!(storage.upload_count(), 1, "rapid writes should share one upload");
    assert_eq!(persisted(&storage).await["tags"].len(), 5);

    drop(store);
    handle.abort();
}

#[tokio::test]
async fn test_delayed_writes_upload_separately() {
    let storage = Arc::new(MockStorage::new());
    let (store, handle) = spawn_worker(storage.clone());
    let tags = store.collection("tags");

    tags.insert(&json!({"_id": "first"})).unwrap();
    sleep(Duration::from_millis(700)).await;
    assert_eq!(storage.upload_count(), 1);

    tags.delete("first");
    sleep(Duration::from_millis(700)).await;
    assert_eq!(storage.upload_count(), 2);
    assert!(persisted(&storage).await["tags"].is_empty());

    drop(store);
    handle.abort();
}

#[tokio::test]
async fn test_concurrent_writers_all_reach_storage() {
    let storage = Arc::new(MockStorage::new());
    let (store, handle) = spawn_worker(storage.clone());

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let tags = store.collection("tags");
            std::thread::spawn(move || {
                for i in 0..25 {
                    tags.insert(&json!({"_id": format!("w{}-{}", w, i)})).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    sleep(Duration::from_millis(800)).await;

    assert!(storage.upload_count() >= 1);
    assert_eq!(persisted(&storage).await["tags"].len(), 100);

    drop(store);
    handle.abort();
}

#[tokio::test]
async fn test_worker_survives_storage_failure() {
    let storage = Arc::new(MockStorage::failing());
    let (store, handle) = spawn_worker(storage.clone());

    store.collection("tags").insert(&json!({"_id": "t1"})).unwrap();
    sleep(Duration::from_millis(700)).await;

    assert!(!handle.is_finished(), "worker should keep running after a failed upload");
    assert_eq!(storage.upload_count(), 0);

    drop(store);
    handle.abort();
}

#[tokio::test]
async fn test_worker_stops_when_store_dropped() {
    let storage = Arc::new(MockStorage::new());
    let (store, handle) = spawn_worker(storage.clone());

    drop(store);
    sleep(Duration::from_millis(100)).await;

    assert!(handle.is_finished(), "worker should stop once every sender is gone");
    assert_eq!(storage.upload_count(), 0);
}

#[tokio::test]
async fn test_load_snapshot_restores_store() {
    let storage = MockStorage::new();
    let snapshot = json!({"ministries": [{"_id": "m1", "en": {"name": "Health", "imageUrl": ""}}]});
    storage
        .upload_file(SNAPSHOT_FILE, &serde_json::to_vec(&snapshot).unwrap(), None)
        .await
        .unwrap();

    let store = DocumentStore::from_snapshot(load_snapshot(&storage).await);
    assert!(store.collection("ministries").find_by_id("m1").is_some());
}

#[tokio::test]
async fn test_missing_or_corrupt_snapshot_starts_empty() {
    let storage = MockStorage::new();
    assert!(load_snapshot(&storage).await.is_empty());

    storage.upload_file(SNAPSHOT_FILE, b"not json", None).await.unwrap();
    assert!(load_snapshot(&storage).await.is_empty());
}
