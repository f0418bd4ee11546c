use aerie_shared::FileId;
use thiserror::Error;

use aerie_store::StoreError;

/// Errors produced by the chat layer.
///
/// None of these are fatal: call sites convert them into local UI state
/// (an inline error banner, a "failed to load" placeholder) and the
/// session keeps running.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Store error propagated from the document layer.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Download attempted for a file id with zero chunk documents.
    #[error("No chunks found for attachment {0}")]
    AttachmentNotFound(FileId),

    /// The fetched chunk set does not cover the full index range.
    #[error("Attachment {file_id} is incomplete: expected {expected} chunks, found {found}")]
    IncompleteAttachment {
        file_id: FileId,
        expected: usize,
        found: usize,
    },

    /// Attachment rejected before upload.
    #[error("Attachment too large: {size} bytes (max {max})")]
    AttachmentTooLarge { size: usize, max: usize },

    /// A stored message document is missing a required attachment field.
    #[error("Malformed message record: {0}")]
    InvalidRecord(String),

    /// Refused to send a blank message.
    #[error("Message text is empty")]
    EmptyMessage,

    /// Authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors from the credential/session layer.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email and password must not be empty")]
    MissingCredentials,
}
