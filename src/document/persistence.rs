//! Background persistence worker for the document store.
//!
//! Writes to the store send a unit signal on a channel of capacity one. The
//! worker debounces the signals, snapshots the store itself and uploads the
//! result, so an upload never carries older state than a later one.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{DocumentStore, Snapshot};
use crate::storage::ObjectStorage;

pub const SNAPSHOT_FILE: &str = "documents.json";
const DEBOUNCE_MS: u64 = 500;

/// Channel between a store and its worker. One pending signal is enough.
pub fn persistence_channel() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    mpsc::channel(1)
}

/// Starts the background persistence worker for `store`.
///
/// Returns when every signalling handle of the store has been dropped.
pub async fn start_persistence_worker(
    mut receiver: mpsc::Receiver<()>,
    store: DocumentStore,
    storage: Arc<dyn ObjectStorage + Send + Sync>,
) {
    // The worker's own handle must not keep the channel open.
    let store = store.detached();
    log::info!("Document persistence worker started");

    while receiver.recv().await.is_some() {
        tokio::time::sleep(tokio::time::Duration::from_millis(DEBOUNCE_MS)).await;

        // Writes during the delay are covered by the snapshot below.
        while receiver.try_recv().is_ok() {
            log::debug!("Batching document writes after debounce delay");
        }

        let snapshot = store.snapshot();
        match serde_json::to_vec(&snapshot) {
            Ok(json_data) => {
                if let Err(e) = storage
                    .upload_file(SNAPSHOT_FILE, &json_data, Some("application/json"))
                    .await
                {
                    log::error!("Failed to persist document snapshot to storage: {}", e);
                } else {
                    let total: usize = snapshot.values().map(Vec::len).sum();
                    log::info!(
                        "Document snapshot persisted ({} collections, {} documents)",
                        snapshot.len(),
                        total
                    );
                }
            }
            Err(e) => {
                log::error!("Failed to serialize document snapshot: {}", e);
            }
        }
    }

    log::info!("Document persistence worker stopped");
}

/// Loads the last persisted snapshot. A missing or unreadable snapshot starts
/// an empty store.
pub async fn load_snapshot(storage: &(dyn ObjectStorage + Send + Sync)) -> Snapshot {
    match storage.download_file(SNAPSHOT_FILE).await {
        Ok(bytes) => match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                log::info!("Loaded document snapshot with {} collections", snapshot.len());
                snapshot
            }
            Err(e) => {
                log::error!("Stored document snapshot is not valid JSON, starting empty: {}", e);
                Snapshot::new()
            }
        },
        Err(e) => {
            log::warn!("No document snapshot loaded ({}), starting empty", e);
            Snapshot::new()
        }
    }
}
