use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// One stored document: a JSON body plus the metadata the store stamps on
/// insert.
///
/// `seq` is strictly increasing across the whole database and never
/// reused, so `(created_at, seq)` is a total order over documents even
/// when two writes land in the same microsecond.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned (or caller-chosen, for keyed upserts) identifier,
    /// unique within its collection.
    pub id: String,
    /// Insertion sequence number.
    pub seq: i64,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
    /// The document fields.
    pub body: Value,
}

impl Document {
    /// Deserialize the body into a typed record.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}
