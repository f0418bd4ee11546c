//! Ephemeral channel lifecycle: purge a user's secure messages when
//! their session ends.
//!
//! The purge is best-effort cleanup. A failure is logged and swallowed;
//! the chat must keep functioning either way, and nothing retries.
//! Chunks referenced by purged attachment messages are left behind (see
//! [`crate::maintenance::sweep_orphan_chunks`] for the out-of-band
//! remedy).

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use aerie_shared::constants::{COLLECTION_SECURE_MESSAGES, MAX_BATCH_OPS};
use aerie_shared::Uid;
use aerie_store::{DocumentStore, Query};

use crate::auth::Session;
use crate::error::ChatError;

/// Deletes everything a user wrote in the secure channel once their
/// session ends.
///
/// A session moves through three phases: connected while the identity
/// stream holds `Some`, disconnecting once `None` (or stream teardown)
/// is observed, purged when the batched delete pass finishes.
pub struct SessionPurger<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> SessionPurger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Purge and swallow the outcome. This is the entry point the
    /// session watcher uses; call sites that need the result use
    /// [`try_purge`](Self::try_purge).
    pub async fn purge_session(&self, uid: &Uid) {
        match self.try_purge(uid).await {
            Ok(count) => info!(uid = %uid.short(), count, "secure channel purged"),
            Err(e) => warn!(uid = %uid.short(), error = %e, "secure channel purge failed"),
        }
    }

    /// Delete all secure-channel messages owned by `uid`, in batches of
    /// at most the store's per-commit cap. Each full batch commits
    /// before the next starts; a final partial batch commits last.
    /// Other users' messages are never touched.
    pub async fn try_purge(&self, uid: &Uid) -> Result<usize, ChatError> {
        let docs = self
            .store
            .query(
                COLLECTION_SECURE_MESSAGES,
                &Query::new().where_eq("uid", json!(uid.as_str())),
            )
            .await?;

        let ids: Vec<String> = docs.into_iter().map(|doc| doc.id).collect();
        let mut deleted = 0usize;
        for batch in ids.chunks(MAX_BATCH_OPS) {
            self.store
                .batch_delete(COLLECTION_SECURE_MESSAGES, batch)
                .await?;
            deleted += batch.len();
            debug!(uid = %uid.short(), deleted, total = ids.len(), "purge batch committed");
        }

        Ok(deleted)
    }

    /// Watch the identity stream and purge whenever a session ends:
    /// sign-out, or the stream closing while a session was still active
    /// (component teardown).
    pub fn spawn(self, mut sessions: watch::Receiver<Option<Session>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut active: Option<Session> = sessions.borrow().clone();

            loop {
                let closed = sessions.changed().await.is_err();
                let current = if closed {
                    None
                } else {
                    sessions.borrow().clone()
                };

                if let (Some(prev), None) = (&active, &current) {
                    debug!(uid = %prev.uid.short(), "session disconnecting");
                    self.purge_session(&prev.uid).await;
                }

                active = current;
                if closed {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerie_store::SqliteStore;
    use std::time::Duration;

    async fn seed_messages(store: &SqliteStore, uid: &Uid, n: usize) {
        for i in 0..n {
            store
                .add(
                    COLLECTION_SECURE_MESSAGES,
                    json!({
                        "text": format!("msg {i}"),
                        "sender": "a@b.c",
                        "uid": uid.as_str(),
                        "autoDestruct": true
                    }),
                )
                .await
                .unwrap();
        }
    }

    async fn count_for(store: &SqliteStore, uid: &Uid) -> usize {
        store
            .query(
                COLLECTION_SECURE_MESSAGES,
                &Query::new().where_eq("uid", json!(uid.as_str())),
            )
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn purge_spans_multiple_batches() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let purger = SessionPurger::new(store.clone());

        let target = Uid::generate();
        let bystander = Uid::generate();

        // More than one batch cap's worth for the target user.
        seed_messages(&store, &target, MAX_BATCH_OPS + 120).await;
        seed_messages(&store, &bystander, 30).await;

        let deleted = purger.try_purge(&target).await.unwrap();
        assert_eq!(deleted, MAX_BATCH_OPS + 120);

        assert_eq!(count_for(&store, &target).await, 0);
        assert_eq!(count_for(&store, &bystander).await, 30);
    }

    #[tokio::test]
    async fn purge_with_nothing_to_delete_is_fine() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let purger = SessionPurger::new(store);
        assert_eq!(purger.try_purge(&Uid::generate()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sign_out_triggers_purge() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let uid = Uid::generate();
        seed_messages(&store, &uid, 12).await;

        let (tx, rx) = watch::channel(Some(Session {
            uid: uid.clone(),
            email: "a@b.c".into(),
        }));

        let handle = SessionPurger::new(store.clone()).spawn(rx);
        tx.send_replace(None);

        // Purge is asynchronous; poll until it lands.
        for _ in 0..100 {
            if count_for(&store, &uid).await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(count_for(&store, &uid).await, 0);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn teardown_with_active_session_purges() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let uid = Uid::generate();
        seed_messages(&store, &uid, 5).await;

        let (tx, rx) = watch::channel(Some(Session {
            uid: uid.clone(),
            email: "a@b.c".into(),
        }));

        let handle = SessionPurger::new(store.clone()).spawn(rx);
        drop(tx); // identity stream torn down mid-session

        handle.await.unwrap();
        assert_eq!(count_for(&store, &uid).await, 0);
    }

    #[tokio::test]
    async fn purger_reacts_to_auth_client_sign_out() {
        use crate::auth::AuthClient;

        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let auth = AuthClient::new(store.clone());

        let handle = SessionPurger::new(store.clone()).spawn(auth.subscribe());

        let session = auth.sign_up("a@b.c", "pw").await.unwrap();
        seed_messages(&store, &session.uid, 7).await;

        auth.sign_out();
        for _ in 0..100 {
            if count_for(&store, &session.uid).await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(count_for(&store, &session.uid).await, 0);

        drop(auth);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sign_in_then_out_then_in_purges_once_per_session() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let uid = Uid::generate();

        let (tx, rx) = watch::channel(None::<Session>);
        let handle = SessionPurger::new(store.clone()).spawn(rx);

        let session = Session {
            uid: uid.clone(),
            email: "a@b.c".into(),
        };
        tx.send_replace(Some(session.clone()));
        // Give the watcher a chance to observe the sign-in before the
        // sign-out lands; watch channels coalesce rapid updates.
        tokio::time::sleep(Duration::from_millis(20)).await;
        seed_messages(&store, &uid, 3).await;
        tx.send_replace(None);

        for _ in 0..100 {
            if count_for(&store, &uid).await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(count_for(&store, &uid).await, 0);

        // New messages in a new session survive until that session ends.
        tx.send_replace(Some(session));
        seed_messages(&store, &uid, 2).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count_for(&store, &uid).await, 2);

        drop(tx);
        handle.await.unwrap();
        assert_eq!(count_for(&store, &uid).await, 0);
    }
}
