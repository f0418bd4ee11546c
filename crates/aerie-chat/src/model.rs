//! Typed views of the documents the chat layer reads and writes.
//!
//! Documents are stored flat (camelCase fields, attachment fields only
//! present on attachment messages). The flat [`MessageRecord`] is the
//! serde shape; [`ChannelMessage`] with its tagged [`MessageBody`] is
//! what the rest of the application consumes, so "is this an attachment"
//! is a match, not a field-presence check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aerie_shared::{AttachmentKind, AttachmentStatus, FileId, Uid};
use aerie_store::Document;

use crate::error::ChatError;

fn is_false(v: &bool) -> bool {
    !*v
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Flat document shape of one channel message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Literal text, or the attachment's display name.
    pub text: String,
    /// Human-readable sender identity (email).
    pub sender: String,
    /// Identity of the sending session.
    pub uid: Uid,
    /// Present only on attachment messages.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AttachmentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AttachmentStatus>,
    /// Persistent-channel display flag; toggling never affects delivery.
    #[serde(default)]
    pub archived: bool,
    /// Set on secure-channel messages; marks them for purge on session
    /// end.
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_destruct: bool,
}

impl MessageRecord {
    /// A plain text message.
    pub fn text(text: impl Into<String>, sender: impl Into<String>, uid: Uid, ephemeral: bool) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            uid,
            kind: None,
            file_id: None,
            file_name: None,
            mime_type: None,
            total_chunks: None,
            status: None,
            archived: false,
            auto_destruct: ephemeral,
        }
    }

    /// The message written after an attachment's chunks have all landed.
    #[allow(clippy::too_many_arguments)]
    pub fn attachment(
        sender: impl Into<String>,
        uid: Uid,
        kind: AttachmentKind,
        file_id: FileId,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        total_chunks: u32,
        ephemeral: bool,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            text: file_name.clone(),
            sender: sender.into(),
            uid,
            kind: Some(kind),
            file_id: Some(file_id),
            file_name: Some(file_name),
            mime_type: Some(mime_type.into()),
            total_chunks: Some(total_chunks),
            status: Some(AttachmentStatus::Completed),
            archived: false,
            auto_destruct: ephemeral,
        }
    }
}

/// Attachment metadata carried by an attachment message.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentInfo {
    pub kind: AttachmentKind,
    pub file_id: FileId,
    pub file_name: String,
    pub mime_type: String,
    pub total_chunks: u32,
    pub status: AttachmentStatus,
}

/// What a message carries.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    Attachment(AttachmentInfo),
}

/// A message as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    /// Store-assigned identifier.
    pub id: String,
    /// Human-readable sender identity.
    pub sender: String,
    /// Identity of the sending session.
    pub uid: Uid,
    /// Server-assigned ordering key.
    pub timestamp: DateTime<Utc>,
    pub archived: bool,
    pub body: MessageBody,
}

impl ChannelMessage {
    /// Build the typed view of a stored message document.
    ///
    /// An attachment message without a file id is malformed: nothing
    /// could ever reconstruct its payload.
    pub fn from_document(doc: &Document) -> Result<Self, ChatError> {
        let record: MessageRecord = doc.deserialize()?;

        let body = match record.kind {
            None => MessageBody::Text(record.text),
            Some(kind) => {
                let file_id = record.file_id.ok_or_else(|| {
                    ChatError::InvalidRecord(format!(
                        "attachment message {} has no fileId",
                        doc.id
                    ))
                })?;
                MessageBody::Attachment(AttachmentInfo {
                    kind,
                    file_id,
                    file_name: record.file_name.unwrap_or(record.text),
                    mime_type: record
                        .mime_type
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                    total_chunks: record.total_chunks.unwrap_or(0),
                    status: record.status.unwrap_or(AttachmentStatus::Completed),
                })
            }
        };

        Ok(Self {
            id: doc.id.clone(),
            sender: record.sender,
            uid: record.uid,
            timestamp: doc.created_at,
            archived: record.archived,
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// File chunk
// ---------------------------------------------------------------------------

/// One shard of an attachment payload. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileChunk {
    /// Shared by all chunks of one file.
    pub file_id: FileId,
    /// Zero-based position within the file.
    pub index: u32,
    /// Total shard count, identical on every chunk of the file.
    pub total_chunks: u32,
    /// A bounded-length substring of the file's base64 data string.
    pub chunk: String,
    pub mime_type: String,
    pub uid: Uid,
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Liveness record, keyed by uid in the `onlineUsers` collection.
/// Absence means offline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMarker {
    pub email: String,
    pub online: bool,
    pub last_seen: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user account document, keyed by uid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: String,
    /// Hex BLAKE3 of salt + password.
    pub password_hash: String,
    /// Hex-encoded random salt.
    pub salt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}
