//! The [`DocumentStore`] trait: the capability every Aerie component is
//! written against.
//!
//! Components take the store as an injected `Arc<S>` rather than reaching
//! for a singleton, so tests can substitute failure-injecting or
//! in-memory implementations.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::document::Document;
use crate::error::Result;
use crate::query::Query;

/// Emitted on the change stream after every committed mutation.
///
/// Subscribers re-run their query against the named collection to obtain
/// a fresh snapshot; the event itself carries no document data.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// The collection that was mutated.
    pub collection: String,
}

/// Document CRUD over named collections, with ordered queries, change
/// notifications and capped atomic batch deletes.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a document with a store-assigned id. Returns the stored
    /// document including its stamped metadata.
    async fn add(&self, collection: &str, body: Value) -> Result<Document>;

    /// Insert or overwrite a document with a caller-chosen id. An
    /// existing document keeps its original sequence number and creation
    /// timestamp; only the body is replaced.
    async fn set(&self, collection: &str, id: &str, body: Value) -> Result<Document>;

    /// Shallow-merge a JSON object patch into an existing document's
    /// body. Fails with [`StoreError::NotFound`](crate::StoreError::NotFound)
    /// if the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;

    /// Fetch a single document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Delete a single document. Deleting a missing document is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Run a point-in-time query.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    /// Delete up to [`MAX_BATCH_OPS`](aerie_shared::constants::MAX_BATCH_OPS)
    /// documents in one atomic commit. Larger batches are rejected;
    /// missing ids are ignored. Atomicity holds per call, not across
    /// calls.
    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<()>;

    /// Subscribe to the change stream.
    fn changes(&self) -> broadcast::Receiver<StoreEvent>;
}
