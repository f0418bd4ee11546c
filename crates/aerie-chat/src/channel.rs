//! Message channels: append-only, time-ordered streams of message
//! documents, rendered from live store snapshots.
//!
//! Two profiles share one implementation. The persistent channel asks
//! the store for the newest 50 messages (descending) and reverses them;
//! the secure channel fetches its collection unordered and sorts
//! client-side. Both deliver chronological-ascending snapshots.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::warn;

use aerie_shared::constants::{COLLECTION_MESSAGES, COLLECTION_SECURE_MESSAGES};
use aerie_shared::Uid;
use aerie_store::{live_query, Direction, DocumentStore, Query};

use crate::error::ChatError;
use crate::model::{ChannelMessage, MessageRecord};

/// How many messages the persistent channel keeps in view.
const RECENCY_LIMIT: u32 = 50;

/// Buffered snapshots per channel subscription.
const SNAPSHOT_BUFFER: usize = 16;

/// Static description of a channel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelProfile {
    /// Backing collection.
    pub collection: &'static str,
    /// Whether messages are purged when their author's session ends.
    pub ephemeral: bool,
    /// Store-side cap on the subscription, newest first. `None` means
    /// unbounded.
    pub recency_limit: Option<u32>,
}

impl ChannelProfile {
    /// The main, persistent channel.
    pub fn persistent() -> Self {
        Self {
            collection: COLLECTION_MESSAGES,
            ephemeral: false,
            recency_limit: Some(RECENCY_LIMIT),
        }
    }

    /// The self-destructing secure channel.
    pub fn secure() -> Self {
        Self {
            collection: COLLECTION_SECURE_MESSAGES,
            ephemeral: true,
            recency_limit: None,
        }
    }
}

/// A live view over one channel's collection.
pub struct MessageChannel<S> {
    store: Arc<S>,
    profile: ChannelProfile,
}

impl<S: DocumentStore> MessageChannel<S> {
    pub fn new(store: Arc<S>, profile: ChannelProfile) -> Self {
        Self { store, profile }
    }

    pub fn persistent(store: Arc<S>) -> Self {
        Self::new(store, ChannelProfile::persistent())
    }

    pub fn secure(store: Arc<S>) -> Self {
        Self::new(store, ChannelProfile::secure())
    }

    pub fn profile(&self) -> ChannelProfile {
        self.profile
    }

    /// Write one plain-text message. Returns the new message id.
    pub async fn send(&self, text: &str, sender: &str, uid: &Uid) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let record = MessageRecord::text(text, sender, uid.clone(), self.profile.ephemeral);
        let doc = self
            .store
            .add(self.profile.collection, serde_json::to_value(&record)?)
            .await?;
        Ok(doc.id)
    }

    /// Subscribe to the channel.
    ///
    /// Each received value is the full current view in chronological
    /// order; malformed documents are logged and skipped rather than
    /// breaking the stream.
    pub fn subscribe(&self) -> mpsc::Receiver<Vec<ChannelMessage>> {
        let query = match self.profile.recency_limit {
            Some(n) => Query::new()
                .order_by_created(Direction::Descending)
                .limit(n),
            None => Query::new(),
        };

        let mut snapshots = live_query(self.store.clone(), self.profile.collection, query);
        let newest_first = self.profile.recency_limit.is_some();
        let collection = self.profile.collection;

        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        tokio::spawn(async move {
            while let Some(mut docs) = snapshots.recv().await {
                if newest_first {
                    docs.reverse();
                } else {
                    docs.sort_by(|a, b| (a.created_at, a.seq).cmp(&(b.created_at, b.seq)));
                }

                let messages: Vec<ChannelMessage> = docs
                    .iter()
                    .filter_map(|doc| match ChannelMessage::from_document(doc) {
                        Ok(msg) => Some(msg),
                        Err(e) => {
                            warn!(collection, id = %doc.id, error = %e, "skipping malformed message");
                            None
                        }
                    })
                    .collect();

                if tx.send(messages).await.is_err() {
                    break;
                }
            }
        });

        rx
    }

    /// Flip a message's archive flag. Pure display affordance: ordering
    /// and delivery are unaffected, and concurrent toggles resolve
    /// last-writer-wins.
    pub async fn toggle_archive(
        &self,
        message_id: &str,
        currently_archived: bool,
    ) -> Result<(), ChatError> {
        self.store
            .update(
                self.profile.collection,
                message_id,
                json!({ "archived": !currently_archived }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageBody;
    use aerie_store::SqliteStore;

    fn store() -> Arc<SqliteStore> {
        Arc::new(SqliteStore::in_memory().unwrap())
    }

    async fn send_n(channel: &MessageChannel<SqliteStore>, uid: &Uid, n: usize) {
        for i in 0..n {
            channel
                .send(&format!("msg {i}"), "a@b.c", uid)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn persistent_channel_delivers_chronological_order() {
        let store = store();
        let channel = MessageChannel::persistent(store);
        let uid = Uid::generate();

        send_n(&channel, &uid, 3).await;

        let mut rx = channel.subscribe();
        let view = rx.recv().await.unwrap();

        let texts: Vec<&str> = view
            .iter()
            .map(|m| match &m.body {
                MessageBody::Text(t) => t.as_str(),
                MessageBody::Attachment(_) => "",
            })
            .collect();
        assert_eq!(texts, vec!["msg 0", "msg 1", "msg 2"]);
        assert!(view.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn secure_channel_delivers_chronological_order() {
        let store = store();
        let channel = MessageChannel::secure(store);
        let uid = Uid::generate();

        send_n(&channel, &uid, 3).await;

        let mut rx = channel.subscribe();
        let view = rx.recv().await.unwrap();
        let texts: Vec<&str> = view
            .iter()
            .map(|m| match &m.body {
                MessageBody::Text(t) => t.as_str(),
                MessageBody::Attachment(_) => "",
            })
            .collect();
        assert_eq!(texts, vec!["msg 0", "msg 1", "msg 2"]);
    }

    #[tokio::test]
    async fn persistent_channel_caps_view_at_recency_limit() {
        let store = store();
        let channel = MessageChannel::persistent(store);
        let uid = Uid::generate();

        send_n(&channel, &uid, 60).await;

        let mut rx = channel.subscribe();
        let view = rx.recv().await.unwrap();

        assert_eq!(view.len(), 50);
        // The cap drops the oldest messages, not the newest.
        assert_eq!(view[0].body, MessageBody::Text("msg 10".into()));
        assert_eq!(view[49].body, MessageBody::Text("msg 59".into()));
    }

    #[tokio::test]
    async fn secure_channel_is_unbounded() {
        let store = store();
        let channel = MessageChannel::secure(store);
        let uid = Uid::generate();

        send_n(&channel, &uid, 60).await;

        let mut rx = channel.subscribe();
        assert_eq!(rx.recv().await.unwrap().len(), 60);
    }

    #[tokio::test]
    async fn subscription_sees_new_messages() {
        let store = store();
        let channel = MessageChannel::persistent(store);
        let uid = Uid::generate();

        let mut rx = channel.subscribe();
        assert!(rx.recv().await.unwrap().is_empty());

        channel.send("hello", "a@b.c", &uid).await.unwrap();
        let view = rx.recv().await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].sender, "a@b.c");
    }

    #[tokio::test]
    async fn blank_messages_are_rejected() {
        let store = store();
        let channel = MessageChannel::persistent(store);
        let err = channel
            .send("   ", "a@b.c", &Uid::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
    }

    #[tokio::test]
    async fn toggle_archive_flips_flag_without_hiding() {
        let store = store();
        let channel = MessageChannel::persistent(store);
        let uid = Uid::generate();

        let id = channel.send("keep me", "a@b.c", &uid).await.unwrap();
        channel.toggle_archive(&id, false).await.unwrap();

        let mut rx = channel.subscribe();
        let view = rx.recv().await.unwrap();
        assert_eq!(view.len(), 1);
        assert!(view[0].archived);

        channel.toggle_archive(&id, true).await.unwrap();
        let view = rx.recv().await.unwrap();
        assert!(!view[0].archived);
    }
}
