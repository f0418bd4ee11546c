use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A lookup expected a document but found none.
    #[error("Document not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A batch exceeded the per-commit operation ceiling.
    #[error("Batch of {len} operations exceeds the cap of {cap}")]
    BatchTooLarge { len: usize, cap: usize },

    /// A filter or order field name contained characters outside
    /// `[A-Za-z0-9_]`.
    #[error("Invalid field name: {0:?}")]
    InvalidField(String),

    /// A filter value was not a boolean, number or string scalar.
    #[error("Unsupported filter value for field {0:?}")]
    UnsupportedFilterValue(String),

    /// An update patch (or the stored body it merges into) was not a JSON
    /// object.
    #[error("Update patch must be a JSON object")]
    InvalidPatch,

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Timestamp parse error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
