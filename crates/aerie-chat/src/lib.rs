//! # aerie-chat
//!
//! The Aerie chat protocol layer: everything between a UI surface and the
//! document store.
//!
//! - [`codec`] splits base64 attachment payloads into bounded chunks and
//!   reassembles them.
//! - [`transfer`] uploads attachments chunk-by-chunk and lazily rebuilds
//!   them on demand.
//! - [`channel`] is the message stream itself, in a persistent and a
//!   self-destructing ("secure") profile.
//! - [`lifecycle`] purges a user's secure messages when their session
//!   ends.
//! - [`presence`] maintains the online-marker set.
//! - [`auth`] is the credential/session layer other components key off.
//! - [`assistant`] talks to the local completion relay.
//!
//! Every component takes the store as an injected `Arc<S>` where
//! `S: DocumentStore`; nothing here owns authoritative state outside the
//! store.

pub mod assistant;
pub mod auth;
pub mod channel;
pub mod codec;
pub mod lifecycle;
pub mod maintenance;
pub mod model;
pub mod presence;
pub mod projects;
pub mod transfer;

mod error;

pub use assistant::{AssistantClient, FALLBACK_REPLY};
pub use auth::{AuthClient, Session};
pub use channel::{ChannelProfile, MessageChannel};
pub use error::{AuthError, ChatError};
pub use lifecycle::SessionPurger;
pub use maintenance::sweep_orphan_chunks;
pub use model::{AttachmentInfo, ChannelMessage, MessageBody};
pub use presence::{watch_online, OnlineUser, PresenceTracker};
pub use projects::{Project, ProjectBoard, ProjectDraft};
pub use transfer::{AttachmentTransfer, UploadRequest};
