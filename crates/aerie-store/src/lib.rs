//! # aerie-store
//!
//! Generic document storage for the Aerie application.
//!
//! The store holds JSON documents in named collections and is the single
//! source of truth for every other component: chat channels, attachment
//! chunks, presence markers and user records all live here. Components
//! never hold authoritative local copies; they issue writes and react to
//! the change stream.
//!
//! The [`DocumentStore`] trait is the seam: everything above it takes the
//! store as an injected dependency, and [`SqliteStore`] is the bundled
//! SQLite-backed implementation.

pub mod document;
pub mod live;
pub mod migrations;
pub mod query;
pub mod sqlite;
pub mod store;

mod error;

pub use document::Document;
pub use error::StoreError;
pub use live::live_query;
pub use query::{Direction, Query};
pub use sqlite::SqliteStore;
pub use store::{DocumentStore, StoreEvent};
