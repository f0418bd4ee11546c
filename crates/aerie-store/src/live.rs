//! Live queries: snapshot-per-change subscriptions.
//!
//! A live query delivers the full result set immediately, then re-runs
//! the query and delivers a fresh snapshot every time its collection is
//! mutated. Consumers therefore never diff events; they replace their
//! view wholesale, which is also how the UI layer renders.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::document::Document;
use crate::query::Query;
use crate::store::DocumentStore;

/// Buffered snapshots per subscription. Consumers that fall behind delay
/// the producer task rather than losing snapshots.
const SNAPSHOT_BUFFER: usize = 16;

/// Subscribe to `query` over `collection`.
///
/// The returned receiver yields the current result set first, then a new
/// result set after every mutation of the collection. The producer task
/// ends when the receiver is dropped or the store's change stream closes.
pub fn live_query<S: DocumentStore>(
    store: Arc<S>,
    collection: impl Into<String>,
    query: Query,
) -> mpsc::Receiver<Vec<Document>> {
    let collection = collection.into();
    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);

    // Subscribe before the initial snapshot so a write landing between
    // the two is never missed.
    let mut changes = store.changes();

    tokio::spawn(async move {
        match store.query(&collection, &query).await {
            Ok(docs) => {
                if tx.send(docs).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(collection = %collection, error = %e, "initial snapshot failed");
            }
        }

        loop {
            match changes.recv().await {
                Ok(event) if event.collection == collection => {}
                Ok(_) => continue,
                // Missed events are recovered by re-querying below.
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }

            match store.query(&collection, &query).await {
                Ok(docs) => {
                    if tx.send(docs).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(collection = %collection, error = %e, "snapshot refresh failed");
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteStore;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_initial_and_updated_snapshots() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.add("messages", json!({"text": "first"})).await.unwrap();

        let mut rx = live_query(store.clone(), "messages", Query::new());

        let initial = rx.recv().await.unwrap();
        assert_eq!(initial.len(), 1);

        store.add("messages", json!({"text": "second"})).await.unwrap();
        let updated = rx.recv().await.unwrap();
        assert_eq!(updated.len(), 2);
    }

    #[tokio::test]
    async fn ignores_other_collections() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut rx = live_query(store.clone(), "messages", Query::new());

        assert!(rx.recv().await.unwrap().is_empty());

        store.add("projects", json!({"title": "x"})).await.unwrap();
        store.add("messages", json!({"text": "hi"})).await.unwrap();

        // The next snapshot is triggered by the messages write only.
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].body["text"], "hi");
    }
}
