//! Presence: one online marker per connected identity.
//!
//! Markers are keyed by uid, so reconnecting overwrites rather than
//! duplicates. There is no heartbeat: a client that dies without a clean
//! disconnect leaves its marker behind until something deletes it. That
//! is a known limitation of the protocol, not something this module
//! papers over.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use aerie_shared::constants::COLLECTION_ONLINE_USERS;
use aerie_shared::Uid;
use aerie_store::{live_query, DocumentStore, Query};

use crate::error::ChatError;
use crate::model::PresenceMarker;

/// An entry of the online-users list.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineUser {
    pub uid: Uid,
    pub email: String,
    pub last_seen: DateTime<Utc>,
}

/// Maintains this session's own marker.
pub struct PresenceTracker<S> {
    store: Arc<S>,
    uid: Uid,
    email: String,
}

impl<S: DocumentStore> PresenceTracker<S> {
    pub fn new(store: Arc<S>, uid: Uid, email: impl Into<String>) -> Self {
        Self {
            store,
            uid,
            email: email.into(),
        }
    }

    /// Publish (or refresh) the online marker.
    pub async fn connect(&self) -> Result<(), ChatError> {
        let marker = PresenceMarker {
            email: self.email.clone(),
            online: true,
            last_seen: Utc::now(),
        };
        self.store
            .set(
                COLLECTION_ONLINE_USERS,
                self.uid.as_str(),
                serde_json::to_value(&marker)?,
            )
            .await?;
        debug!(uid = %self.uid.short(), "presence marker set");
        Ok(())
    }

    /// Remove the marker on clean disconnect.
    pub async fn disconnect(&self) -> Result<(), ChatError> {
        self.store
            .delete(COLLECTION_ONLINE_USERS, self.uid.as_str())
            .await?;
        debug!(uid = %self.uid.short(), "presence marker removed");
        Ok(())
    }
}

/// Live view of everyone currently marked online.
pub fn watch_online<S: DocumentStore>(store: Arc<S>) -> mpsc::Receiver<Vec<OnlineUser>> {
    let query = Query::new().where_eq("online", json!(true));
    let mut snapshots = live_query(store, COLLECTION_ONLINE_USERS, query);

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        while let Some(docs) = snapshots.recv().await {
            let users: Vec<OnlineUser> = docs
                .iter()
                .filter_map(|doc| match doc.deserialize::<PresenceMarker>() {
                    Ok(marker) => Some(OnlineUser {
                        uid: Uid(doc.id.clone()),
                        email: marker.email,
                        last_seen: marker.last_seen,
                    }),
                    Err(e) => {
                        warn!(id = %doc.id, error = %e, "skipping malformed presence marker");
                        None
                    }
                })
                .collect();

            if tx.send(users).await.is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerie_store::SqliteStore;

    #[tokio::test]
    async fn connect_publishes_marker_and_disconnect_removes_it() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let uid = Uid::generate();
        let tracker = PresenceTracker::new(store.clone(), uid.clone(), "a@b.c");

        let mut rx = watch_online(store.clone());
        assert!(rx.recv().await.unwrap().is_empty());

        tracker.connect().await.unwrap();
        let online = rx.recv().await.unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].uid, uid);
        assert_eq!(online[0].email, "a@b.c");

        tracker.disconnect().await.unwrap();
        assert!(rx.recv().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reconnect_overwrites_instead_of_duplicating() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let tracker = PresenceTracker::new(store.clone(), Uid::generate(), "a@b.c");

        tracker.connect().await.unwrap();
        tracker.connect().await.unwrap();

        let docs = store
            .query(COLLECTION_ONLINE_USERS, &Query::new())
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn two_identities_each_get_a_marker() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let a = PresenceTracker::new(store.clone(), Uid::generate(), "a@b.c");
        let b = PresenceTracker::new(store.clone(), Uid::generate(), "b@b.c");

        a.connect().await.unwrap();
        b.connect().await.unwrap();

        let mut rx = watch_online(store);
        let online = rx.recv().await.unwrap();
        assert_eq!(online.len(), 2);
    }
}
