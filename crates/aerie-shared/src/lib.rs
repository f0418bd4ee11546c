//! # aerie-shared
//!
//! Identifiers, enums and protocol constants shared by every Aerie crate.

pub mod constants;
pub mod types;

pub use types::{AttachmentKind, AttachmentStatus, FileId, Uid};
