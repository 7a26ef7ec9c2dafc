use datafeed_status::{StatusRegistry, Timestamps};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::store::MemoryStore;

/// Forwards store timestamp changes into the status registry
///
/// When the forwarder falls behind, the store's current timestamps are
/// recorded instead; stale values are dropped by the registry anyway.
pub fn spawn_timestamp_forwarder(store: Arc<MemoryStore>, registry: StatusRegistry) -> JoinHandle<()> {
    let mut changes = store.subscribe();

    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    registry.record_timestamp_changes(&Timestamps::from([(change.name, change.time)]));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Timestamp forwarder lagged, {} changes skipped; resyncing", skipped);
                    registry.record_timestamp_changes(&store.timestamps().await);
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Timestamp change channel closed");
                    break;
                }
            }
        }
    })
}
