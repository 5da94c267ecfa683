//! SQLite-backed durable store.
//!
//! # Responsibility
//! - Persist key/value pairs in the `kv_entries` table.
//! - Translate SQLite capacity failures into quota errors.
//!
//! # Invariants
//! - Every write is a single upsert statement, so a failed write leaves the
//!   previous value intact.

use super::{DurableStore, StorageError, StorageResult};
use crate::db::{open_db_in_memory, open_db_with, DbOptions, DbResult};
use log::warn;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Durable store over one SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wraps an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>, options: DbOptions) -> DbResult<Self> {
        open_db_with(path, options).map(Self::new)
    }

    /// Opens a migrated in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    /// Lists stored keys in ascending order.
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key FROM kv_entries ORDER BY key ASC;")
            .map_err(backend_error)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(backend_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend_error)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Backend("sqlite store lock poisoned".to_string()))
    }
}

impl DurableStore for SqliteStore {
    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_entries (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )
        .map_err(|err| {
            if err.sqlite_error_code() == Some(ErrorCode::DiskFull) {
                warn!(
                    "event=kv_save module=repo status=error error_code=storage_quota_exceeded key={key} bytes={}",
                    value.len()
                );
                StorageError::QuotaExceeded {
                    key: key.to_string(),
                }
            } else {
                backend_error(err)
            }
        })?;
        Ok(())
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM kv_entries WHERE key = ?1;",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(backend_error)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])
            .map_err(backend_error)?;
        Ok(())
    }
}

fn backend_error(err: rusqlite::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}
