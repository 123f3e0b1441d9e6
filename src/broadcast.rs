use crate::store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Spawn a background task that writes the store to `path` whenever it changed
pub fn spawn_snapshot_writer(
    store: Arc<MemoryStore>,
    path: PathBuf,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut saved = store.generation();

        loop {
            tokio::time::sleep(interval).await;

            let current = store.generation();
            if current == saved {
                continue;
            }

            match store.save_to(&path).await {
                Ok(()) => {
                    tracing::debug!("Snapshot written to {}", path.display());
                    saved = current;
                }
                Err(e) => tracing::warn!("Failed to write snapshot: {}", e),
            }
        }
    })
}
