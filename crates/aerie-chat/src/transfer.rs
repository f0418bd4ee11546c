//! Attachment transfer: chunked upload and lazy, cached download.
//!
//! The store only holds small text fields, so binary payloads travel as
//! base64 data strings split into bounded chunks. Chunk writes are
//! issued strictly in index order and awaited one at a time; the write
//! acknowledgment is the only ordering barrier available, and the
//! message document that makes the attachment visible is always written
//! last. A failed chunk write aborts the upload with no message written,
//! leaving a well-defined prefix of orphaned chunks behind.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use aerie_shared::constants::{CHUNK_SIZE, COLLECTION_FILE_CHUNKS, MAX_ATTACHMENT_SIZE};
use aerie_shared::{AttachmentKind, FileId, Uid};
use aerie_store::{Direction, DocumentStore, Query};

use crate::channel::ChannelProfile;
use crate::codec;
use crate::error::ChatError;
use crate::model::{FileChunk, MessageRecord};

/// An attachment queued for upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Raw file bytes.
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub kind: AttachmentKind,
    /// Human-readable sender identity.
    pub sender: String,
    /// Identity of the uploading session.
    pub uid: Uid,
}

/// Moves attachments through the store for one channel.
///
/// Uploads from different transfers (or concurrent uploads through the
/// same one) cannot interfere: every chunk carries only its own file id.
pub struct AttachmentTransfer<S> {
    store: Arc<S>,
    profile: ChannelProfile,
    chunk_size: usize,
    /// Reconstructed payloads, kept for the lifetime of the channel view
    /// so repeated renders never re-fetch.
    cache: Mutex<HashMap<FileId, String>>,
}

impl<S: DocumentStore> AttachmentTransfer<S> {
    pub fn new(store: Arc<S>, profile: ChannelProfile) -> Self {
        Self::with_chunk_size(store, profile, CHUNK_SIZE)
    }

    /// Override the chunk size (tests use small payloads).
    pub fn with_chunk_size(store: Arc<S>, profile: ChannelProfile, chunk_size: usize) -> Self {
        Self {
            store,
            profile,
            chunk_size,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Upload an attachment and publish its message to the channel.
    ///
    /// `progress` is invoked after each chunk write with the percentage
    /// of chunks committed so far; values are monotonically increasing
    /// and end at 100.
    ///
    /// On any chunk failure the upload aborts: the error is returned, no
    /// message document is written, and chunks `0..k` already committed
    /// stay behind unreferenced.
    pub async fn upload(
        &self,
        request: UploadRequest,
        mut progress: impl FnMut(f64) + Send,
    ) -> Result<FileId, ChatError> {
        if request.data.len() > MAX_ATTACHMENT_SIZE {
            return Err(ChatError::AttachmentTooLarge {
                size: request.data.len(),
                max: MAX_ATTACHMENT_SIZE,
            });
        }

        // The whole payload is encoded up front; attachments are
        // user-selected and bounded by MAX_ATTACHMENT_SIZE.
        let payload = format!(
            "data:{};base64,{}",
            request.mime_type,
            BASE64.encode(&request.data)
        );
        let chunks = codec::encode(&payload, self.chunk_size);
        let total = chunks.len() as u32;

        let file_id = FileId::generate();
        debug!(file_id = %file_id, total, kind = request.kind.as_str(), "starting upload");

        for (index, chunk) in chunks.into_iter().enumerate() {
            let record = FileChunk {
                file_id: file_id.clone(),
                index: index as u32,
                total_chunks: total,
                chunk,
                mime_type: request.mime_type.clone(),
                uid: request.uid.clone(),
            };
            self.store
                .add(COLLECTION_FILE_CHUNKS, serde_json::to_value(&record)?)
                .await?;

            progress((index + 1) as f64 / f64::from(total) * 100.0);
        }

        let message = MessageRecord::attachment(
            request.sender,
            request.uid,
            request.kind,
            file_id.clone(),
            request.file_name,
            request.mime_type,
            total,
            self.profile.ephemeral,
        );
        self.store
            .add(self.profile.collection, serde_json::to_value(&message)?)
            .await?;

        info!(file_id = %file_id, total, "attachment uploaded");
        Ok(file_id)
    }

    /// Reconstruct an attachment's data string.
    ///
    /// Called lazily, when a message is actually about to be rendered.
    /// The chunk set is verified to cover exactly `0..totalChunks` before
    /// concatenation; a partial set fails loudly instead of yielding
    /// silently truncated media.
    pub async fn download(&self, file_id: &FileId) -> Result<String, ChatError> {
        if let Some(payload) = self.cache.lock().await.get(file_id) {
            return Ok(payload.clone());
        }

        let query = Query::new()
            .where_eq("fileId", json!(file_id.as_str()))
            .order_by_field("index", Direction::Ascending);
        let docs = self.store.query(COLLECTION_FILE_CHUNKS, &query).await?;

        if docs.is_empty() {
            return Err(ChatError::AttachmentNotFound(file_id.clone()));
        }

        let chunks: Vec<FileChunk> = docs
            .iter()
            .map(|doc| doc.deserialize::<FileChunk>())
            .collect::<Result<_, _>>()?;

        let expected = chunks[0].total_chunks as usize;
        let contiguous = chunks
            .iter()
            .enumerate()
            .all(|(i, c)| c.index as usize == i);
        if chunks.len() != expected || !contiguous {
            return Err(ChatError::IncompleteAttachment {
                file_id: file_id.clone(),
                expected,
                found: chunks.len(),
            });
        }

        let payload = codec::decode(chunks.iter().map(|c| c.chunk.as_str()));
        debug!(file_id = %file_id, len = payload.len(), "attachment reassembled");

        self.cache
            .lock()
            .await
            .insert(file_id.clone(), payload.clone());
        Ok(payload)
    }
}
