//! v001 -- Initial schema creation.
//!
//! One generic `documents` table holds every collection. `AUTOINCREMENT`
//! guarantees sequence numbers are never reused after deletes, which the
//! ordering contract relies on.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    doc_id     TEXT NOT NULL,
    created_at TEXT NOT NULL,               -- RFC-3339, UTC, fixed width
    body       TEXT NOT NULL,               -- JSON object

    UNIQUE (collection, doc_id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection_created
    ON documents(collection, created_at, seq);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
