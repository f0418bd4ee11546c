//! Query description for [`DocumentStore::query`](crate::DocumentStore::query).
//!
//! Deliberately small: equality filters on named fields, one ordering
//! target, an optional limit. This is the full shape the application
//! needs (chunk lookup by file id ordered by index, channel history by
//! creation time, presence by online flag).

use serde_json::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// What a query orders by.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OrderTarget {
    /// The store-stamped creation timestamp, tiebroken by insertion
    /// sequence.
    CreatedAt,
    /// A field of the document body.
    Field(String),
}

/// An equality filter on one body field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Filter {
    pub field: String,
    pub value: Value,
}

/// A declarative query over one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub(crate) filters: Vec<Filter>,
    pub(crate) order: Option<(OrderTarget, Direction)>,
    pub(crate) limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Order by a body field.
    pub fn order_by_field(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((OrderTarget::Field(field.into()), direction));
        self
    }

    /// Order by the store-stamped creation time (insertion sequence breaks
    /// ties).
    pub fn order_by_created(mut self, direction: Direction) -> Self {
        self.order = Some((OrderTarget::CreatedAt, direction));
        self
    }

    /// Return at most `n` documents.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_accumulates() {
        let q = Query::new()
            .where_eq("fileId", json!("f-1"))
            .order_by_field("index", Direction::Ascending)
            .limit(10);

        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters[0].field, "fileId");
        assert_eq!(q.limit, Some(10));
        assert!(matches!(
            q.order,
            Some((OrderTarget::Field(_), Direction::Ascending))
        ));
    }
}
