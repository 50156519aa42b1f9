//! SQLite metadata store with migrations
//!
//! Maps document → chunks → embedding slot. Every write touching both tables
//! runs in one immediate transaction so readers never observe a document
//! without its chunks or the reverse.

use crate::error::{DocseekError, Result};
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Extracted per-file metadata (sheet names, page counts, ...)
///
/// Stored and returned verbatim; the store never looks inside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataBlob(serde_json::Value);

impl MetadataBlob {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// A document row about to be written
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub path: String,
    pub name: String,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub mtime: f64,
    pub content_hash: String,
    pub chunk_count: usize,
    pub indexed_at: DateTime<Utc>,
    pub metadata: MetadataBlob,
}

/// A live document row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub size: u64,
    pub mtime: f64,
    pub content_hash: String,
    pub chunk_count: usize,
    pub indexed_at: DateTime<Utc>,
    pub metadata: MetadataBlob,
}

/// A chunk row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub id: i64,
    pub document_id: i64,
    pub chunk_index: usize,
    pub content: String,
    pub embedding_slot: usize,
}

/// Document and chunk tables backed by a pooled SQLite file
pub struct MetadataStore {
    pool: DbPool,
}

const DOCUMENT_COLUMNS: &str = "d.id, d.file_path, d.file_name, d.file_size, d.modified_time, \
     d.content_hash, d.chunk_count, d.indexed_at, d.metadata";

impl MetadataStore {
    /// Open (or create) the store at `db_path` and run migrations
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DocseekError::io(e, format!("Failed to create database directory: {:?}", parent))
            })?;
        }

        // foreign_keys and busy_timeout are per-connection settings
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                PRAGMA synchronous = NORMAL;
                ",
            )
        });

        let pool = Pool::builder().max_size(16).build(manager)?;

        {
            let conn = pool.get()?;
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| {
                row.get::<_, String>(0)
            })?;
        }

        let store = Self { pool };
        store.migrate()?;

        Ok(store)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )?;

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);
                conn.execute_batch(migration)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Insert or replace the document for `doc.path`; prior chunks go with it
    pub fn upsert_document(&self, doc: &NewDocument) -> Result<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = upsert_document_in(&tx, doc)?;
        tx.commit()?;
        Ok(id)
    }

    /// Append chunks with ordinals 0..n to a document
    pub fn insert_chunks(&self, document_id: i64, chunks: &[(String, usize)]) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_chunks_in(&tx, document_id, chunks)?;
        tx.commit()?;
        Ok(())
    }

    /// Upsert a document and insert its chunks atomically
    pub fn replace_document(&self, doc: &NewDocument, chunks: &[(String, usize)]) -> Result<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = upsert_document_in(&tx, doc)?;
        insert_chunks_in(&tx, id, chunks)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn get_document_by_path(&self, path: &str) -> Result<Option<Document>> {
        let conn = self.get_conn()?;
        let doc = conn
            .query_row(
                &format!(
                    "SELECT {} FROM documents d WHERE d.file_path = ?1",
                    DOCUMENT_COLUMNS
                ),
                params![path],
                |row| document_from_row(row, 0),
            )
            .optional()?;
        Ok(doc)
    }

    /// Resolve a vector slot to its chunk and owning document
    pub fn get_chunk_by_slot(&self, slot: usize) -> Result<Option<(Chunk, Document)>> {
        let conn = self.get_conn()?;
        let hit = conn
            .query_row(
                &format!(
                    "SELECT c.id, c.document_id, c.chunk_index, c.content, c.embedding_slot, {}
                     FROM chunks c JOIN documents d ON c.document_id = d.id
                     WHERE c.embedding_slot = ?1",
                    DOCUMENT_COLUMNS
                ),
                params![slot as i64],
                |row| Ok((chunk_from_row(row)?, document_from_row(row, 5)?)),
            )
            .optional()?;
        Ok(hit)
    }

    /// Delete a document and its chunks; vector slots are left orphaned
    pub fn delete_document(&self, document_id: i64) -> Result<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id],
        )?;
        let removed = tx.execute("DELETE FROM documents WHERE id = ?1", params![document_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    pub fn delete_document_by_path(&self, path: &str) -> Result<bool> {
        match self.get_document_by_path(path)? {
            Some(doc) => self.delete_document(doc.id),
            None => Ok(false),
        }
    }

    pub fn count_documents(&self) -> Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn count_chunks(&self) -> Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Highest slot referenced by any live chunk
    pub fn max_slot(&self) -> Result<Option<usize>> {
        let conn = self.get_conn()?;
        let max: Option<i64> =
            conn.query_row("SELECT MAX(embedding_slot) FROM chunks", [], |row| {
                row.get(0)
            })?;
        Ok(max.map(|m| m as usize))
    }

    /// Live slots in ascending order
    pub fn live_slots(&self) -> Result<Vec<usize>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT embedding_slot FROM chunks ORDER BY embedding_slot")?;
        let slots = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|slot| slot.map(|s| s as usize))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(slots)
    }

    /// Every live chunk with its document path, ordered by slot
    pub fn all_chunks(&self) -> Result<Vec<(Chunk, String)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.document_id, c.chunk_index, c.content, c.embedding_slot, d.file_path
             FROM chunks c JOIN documents d ON c.document_id = d.id
             ORDER BY c.embedding_slot",
        )?;
        let chunks = stmt
            .query_map([], |row| Ok((chunk_from_row(row)?, row.get(5)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }

    /// `(slot, path, chunk_index)` for every live chunk, ordered by slot
    pub fn slot_owners(&self) -> Result<Vec<(usize, String, usize)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.embedding_slot, d.file_path, c.chunk_index
             FROM chunks c JOIN documents d ON c.document_id = d.id
             ORDER BY c.embedding_slot",
        )?;
        let owners = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)? as usize,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? as usize,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(owners)
    }

    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents d ORDER BY d.file_path",
            DOCUMENT_COLUMNS
        ))?;
        let docs = stmt
            .query_map([], |row| document_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    /// Rewrite slot references in one transaction.
    ///
    /// `mapping` must be sorted by old slot with `new <= old`, which is what a
    /// compaction produces; updating in that order never collides with the
    /// unique slot constraint.
    pub fn remap_slots(&self, mapping: &[(usize, usize)]) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt =
                tx.prepare("UPDATE chunks SET embedding_slot = ?2 WHERE embedding_slot = ?1")?;
            for (old, new) in mapping {
                if old != new {
                    stmt.execute(params![*old as i64, *new as i64])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert_document_in(conn: &Connection, doc: &NewDocument) -> Result<i64> {
    conn.execute(
        "DELETE FROM chunks WHERE document_id IN (SELECT id FROM documents WHERE file_path = ?1)",
        params![doc.path],
    )?;
    conn.execute(
        "DELETE FROM documents WHERE file_path = ?1",
        params![doc.path],
    )?;

    let metadata = serde_json::to_string(&doc.metadata).map_err(|e| DocseekError::Json {
        source: e,
        context: format!("Failed to serialize metadata for {}", doc.path),
    })?;

    conn.execute(
        "INSERT INTO documents
         (file_path, file_name, file_size, modified_time, content_hash, chunk_count, indexed_at, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            doc.path,
            doc.name,
            doc.size as i64,
            doc.mtime,
            doc.content_hash,
            doc.chunk_count as i64,
            doc.indexed_at.to_rfc3339(),
            metadata,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

fn insert_chunks_in(conn: &Connection, document_id: i64, chunks: &[(String, usize)]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO chunks (document_id, chunk_index, content, embedding_slot)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (index, (content, slot)) in chunks.iter().enumerate() {
        stmt.execute(params![document_id, index as i64, content, *slot as i64])?;
    }
    Ok(())
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        id: row.get(0)?,
        document_id: row.get(1)?,
        chunk_index: row.get::<_, i64>(2)? as usize,
        content: row.get(3)?,
        embedding_slot: row.get::<_, i64>(4)? as usize,
    })
}

fn document_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Document> {
    let indexed_at: String = row.get(offset + 7)?;
    let indexed_at = DateTime::parse_from_rfc3339(&indexed_at)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(offset + 7, Type::Text, Box::new(e)))?;

    let metadata: Option<String> = row.get(offset + 8)?;
    let metadata = match metadata {
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(offset + 8, Type::Text, Box::new(e))
        })?,
        None => MetadataBlob::default(),
    };

    Ok(Document {
        id: row.get(offset)?,
        path: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        size: row.get::<_, i64>(offset + 3)? as u64,
        mtime: row.get(offset + 4)?,
        content_hash: row.get(offset + 5)?,
        chunk_count: row.get::<_, i64>(offset + 6)? as usize,
        indexed_at,
        metadata,
    })
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    CREATE TABLE documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_path TEXT NOT NULL UNIQUE,
        file_name TEXT NOT NULL,
        file_size INTEGER NOT NULL,
        modified_time REAL NOT NULL,
        content_hash TEXT NOT NULL,
        chunk_count INTEGER NOT NULL,
        indexed_at TEXT NOT NULL,
        metadata TEXT  -- opaque JSON
    );

    CREATE TABLE chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        document_id INTEGER NOT NULL,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding_slot INTEGER NOT NULL UNIQUE,
        FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE,
        UNIQUE (document_id, chunk_index)
    );

    CREATE INDEX idx_chunks_document ON chunks(document_id);
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_doc(path: &str, chunks: usize) -> NewDocument {
        NewDocument {
            path: path.to_string(),
            name: Path::new(path)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string(),
            size: 42,
            mtime: 1_700_000_000.5,
            content_hash: "abc".to_string(),
            chunk_count: chunks,
            indexed_at: Utc::now(),
            metadata: MetadataBlob::new(serde_json::json!({"sheets": ["Q1", "Q2"]})),
        }
    }

    #[test]
    fn test_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::open(&temp_dir.path().join("test.db")).unwrap();

        let conn = store.get_conn().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i32);
    }

    #[test]
    fn test_foreign_keys_enabled_on_every_connection() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::open(&temp_dir.path().join("test.db")).unwrap();

        let a = store.get_conn().unwrap();
        let b = store.get_conn().unwrap();
        for conn in [&a, &b] {
            let fk: i32 = conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert_eq!(fk, 1);
        }
    }

    #[test]
    fn test_replace_document_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::open(&temp_dir.path().join("test.db")).unwrap();

        let doc = new_doc("/docs/budget.xlsx", 2);
        let id = store
            .replace_document(&doc, &[("first".to_string(), 0), ("second".to_string(), 1)])
            .unwrap();

        let loaded = store.get_document_by_path("/docs/budget.xlsx").unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.chunk_count, 2);
        assert_eq!(loaded.metadata, doc.metadata);
        assert_eq!(loaded.mtime, doc.mtime);

        let (chunk, owner) = store.get_chunk_by_slot(1).unwrap().unwrap();
        assert_eq!(chunk.content, "second");
        assert_eq!(chunk.chunk_index, 1);
        assert_eq!(owner.path, "/docs/budget.xlsx");
    }

    #[test]
    fn test_upsert_replaces_prior_row_and_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::open(&temp_dir.path().join("test.db")).unwrap();

        let doc = new_doc("/docs/a.txt", 1);
        store.replace_document(&doc, &[("old".to_string(), 0)]).unwrap();
        store.replace_document(&doc, &[("new".to_string(), 1)]).unwrap();

        assert_eq!(store.count_documents().unwrap(), 1);
        assert_eq!(store.count_chunks().unwrap(), 1);
        assert!(store.get_chunk_by_slot(0).unwrap().is_none());
        assert_eq!(store.get_chunk_by_slot(1).unwrap().unwrap().0.content, "new");
    }

    #[test]
    fn test_separate_upsert_and_insert() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::open(&temp_dir.path().join("test.db")).unwrap();

        let id = store.upsert_document(&new_doc("/docs/b.md", 2)).unwrap();
        store
            .insert_chunks(id, &[("x".to_string(), 4), ("y".to_string(), 5)])
            .unwrap();

        assert_eq!(store.live_slots().unwrap(), vec![4, 5]);
        assert_eq!(store.max_slot().unwrap(), Some(5));
    }

    #[test]
    fn test_delete_cascades_to_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::open(&temp_dir.path().join("test.db")).unwrap();

        let id = store
            .replace_document(&new_doc("/docs/c.txt", 1), &[("text".to_string(), 0)])
            .unwrap();
        assert!(store.delete_document(id).unwrap());
        assert!(!store.delete_document(id).unwrap());

        assert!(store.get_document_by_path("/docs/c.txt").unwrap().is_none());
        assert!(store.get_chunk_by_slot(0).unwrap().is_none());
        assert_eq!(store.count_chunks().unwrap(), 0);
        assert_eq!(store.max_slot().unwrap(), None);
    }

    #[test]
    fn test_remap_slots() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::open(&temp_dir.path().join("test.db")).unwrap();

        store
            .replace_document(
                &new_doc("/docs/d.txt", 3),
                &[("a".to_string(), 2), ("b".to_string(), 3), ("c".to_string(), 7)],
            )
            .unwrap();

        store.remap_slots(&[(2, 0), (3, 1), (7, 2)]).unwrap();
        assert_eq!(store.live_slots().unwrap(), vec![0, 1, 2]);
        assert_eq!(store.get_chunk_by_slot(2).unwrap().unwrap().0.content, "c");
    }
}
