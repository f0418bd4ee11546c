//! SQLite-backed [`DocumentStore`].
//!
//! Every collection lives in one generic `documents` table; body fields
//! are filtered and ordered with `json_extract`. The connection is held
//! behind an async mutex so store calls are genuine suspension points for
//! callers, matching the one-logical-thread, awaited-I/O model the rest
//! of the application is written against.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use aerie_shared::constants::MAX_BATCH_OPS;

use crate::document::Document;
use crate::error::{Result, StoreError};
use crate::migrations;
use crate::query::{Direction, OrderTarget, Query};
use crate::store::{DocumentStore, StoreEvent};

/// Capacity of the change-notification channel. A lagging subscriber
/// resynchronizes by re-running its query, so overflow is not data loss.
const EVENT_CAPACITY: usize = 256;

/// SQLite-backed document store.
pub struct SqliteStore {
    conn: tokio::sync::Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data
    /// directory:
    /// - Linux:   `~/.local/share/aerie/aerie.db`
    /// - macOS:   `~/Library/Application Support/com.aerie.aerie/aerie.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\aerie\aerie\data\aerie.db`
    pub fn open_default() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "aerie", "aerie").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("aerie.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// Useful for tests and for embedding the store inside custom
    /// directory layouts.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Self::from_connection(conn)
    }

    /// Open a fresh in-memory database. Contents vanish when the store is
    /// dropped; intended for tests and ephemeral sessions.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            conn: tokio::sync::Mutex::new(conn),
            events,
        })
    }

    /// Return the filesystem path of the open database (if any).
    pub async fn path(&self) -> Option<PathBuf> {
        self.conn.lock().await.path().map(PathBuf::from)
    }

    fn notify(&self, collection: &str) {
        // No receivers is fine; events are fire-and-forget.
        let _ = self.events.send(StoreEvent {
            collection: collection.to_string(),
        });
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn add(&self, collection: &str, body: Value) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let seq = {
            let conn = self.conn.lock().await;
            conn.execute(
                "INSERT INTO documents (collection, doc_id, created_at, body)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    collection,
                    id,
                    format_timestamp(&created_at),
                    body.to_string(),
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.notify(collection);

        Ok(Document {
            id,
            seq,
            created_at,
            body,
        })
    }

    async fn set(&self, collection: &str, id: &str, body: Value) -> Result<Document> {
        let doc = {
            let conn = self.conn.lock().await;
            conn.execute(
                "INSERT INTO documents (collection, doc_id, created_at, body)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (collection, doc_id) DO UPDATE SET body = excluded.body",
                params![
                    collection,
                    id,
                    format_timestamp(&Utc::now()),
                    body.to_string(),
                ],
            )?;

            conn.query_row(
                "SELECT doc_id, seq, created_at, body FROM documents
                 WHERE collection = ?1 AND doc_id = ?2",
                params![collection, id],
                row_to_document,
            )?
        };

        self.notify(collection);
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        let Value::Object(patch_fields) = patch else {
            return Err(StoreError::InvalidPatch);
        };

        {
            let mut conn = self.conn.lock().await;
            let tx = conn.transaction()?;

            let body_str: Option<String> = tx
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(body_str) = body_str else {
                return Err(StoreError::NotFound);
            };

            let mut body: Value = serde_json::from_str(&body_str)?;
            let Value::Object(ref mut fields) = body else {
                return Err(StoreError::InvalidPatch);
            };
            for (key, value) in patch_fields {
                fields.insert(key, value);
            }

            tx.execute(
                "UPDATE documents SET body = ?1 WHERE collection = ?2 AND doc_id = ?3",
                params![body.to_string(), collection, id],
            )?;
            tx.commit()?;
        }

        self.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock().await;
        let doc = conn
            .query_row(
                "SELECT doc_id, seq, created_at, body FROM documents
                 WHERE collection = ?1 AND doc_id = ?2",
                params![collection, id],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let affected = {
            let conn = self.conn.lock().await;
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, id],
            )?
        };

        if affected > 0 {
            self.notify(collection);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let (sql, bindings) = build_select(collection, query)?;

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bindings.iter()), row_to_document)?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?);
        }
        Ok(docs)
    }

    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        if ids.len() > MAX_BATCH_OPS {
            return Err(StoreError::BatchTooLarge {
                len: ids.len(),
                cap: MAX_BATCH_OPS,
            });
        }
        if ids.is_empty() {
            return Ok(());
        }

        let affected = {
            let mut conn = self.conn.lock().await;
            let tx = conn.transaction()?;
            let mut affected = 0usize;
            for id in ids {
                affected += tx.execute(
                    "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                    params![collection, id],
                )?;
            }
            tx.commit()?;
            affected
        };

        tracing::debug!(collection = %collection, requested = ids.len(), affected, "batch delete");

        if affected > 0 {
            self.notify(collection);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fixed-width RFC-3339 in UTC so lexicographic order equals chronological
/// order in SQL.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Map a `rusqlite::Row` to a [`Document`].
fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    let seq: i64 = row.get(1)?;
    let created_str: String = row.get(2)?;
    let body_str: String = row.get(3)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let body: Value = serde_json::from_str(&body_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Document {
        id,
        seq,
        created_at,
        body,
    })
}

fn validate_field(field: &str) -> Result<()> {
    if field.is_empty()
        || !field
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(StoreError::InvalidField(field.to_string()));
    }
    Ok(())
}

/// Convert a scalar JSON filter value into a SQLite binding compatible
/// with what `json_extract` yields (booleans surface as 0/1 integers).
fn scalar_param(field: &str, value: &Value) -> Result<SqlValue> {
    match value {
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .ok_or_else(|| StoreError::UnsupportedFilterValue(field.to_string())),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        _ => Err(StoreError::UnsupportedFilterValue(field.to_string())),
    }
}

fn direction_sql(direction: Direction) -> &'static str {
    match direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
    }
}

fn build_select(collection: &str, query: &Query) -> Result<(String, Vec<SqlValue>)> {
    let mut sql =
        String::from("SELECT doc_id, seq, created_at, body FROM documents WHERE collection = ?");
    let mut bindings: Vec<SqlValue> = vec![SqlValue::Text(collection.to_string())];

    for filter in &query.filters {
        validate_field(&filter.field)?;
        sql.push_str(" AND json_extract(body, ?) = ?");
        bindings.push(SqlValue::Text(format!("$.{}", filter.field)));
        bindings.push(scalar_param(&filter.field, &filter.value)?);
    }

    match &query.order {
        Some((OrderTarget::Field(name), direction)) => {
            validate_field(name)?;
            let dir = direction_sql(*direction);
            sql.push_str(&format!(" ORDER BY json_extract(body, ?) {dir}, seq {dir}"));
            bindings.push(SqlValue::Text(format!("$.{name}")));
        }
        Some((OrderTarget::CreatedAt, direction)) => {
            let dir = direction_sql(*direction);
            sql.push_str(&format!(" ORDER BY created_at {dir}, seq {dir}"));
        }
        None => {}
    }

    if let Some(n) = query.limit {
        sql.push_str(" LIMIT ?");
        bindings.push(SqlValue::Integer(i64::from(n)));
    }

    Ok((sql, bindings))
}
