//! SQLite File History
//!
//! Embedded database for the session file-version history using rusqlite
//! with r2d2 connection pooling. Version numbers are allocated inside a
//! transaction, so appends on the same `(session, path)` are linearizable.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::services::history::{FileHistoryService, FileVersion};
use crate::utils::error::{AppError, AppResult};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// SQLite-backed implementation of `FileHistoryService`.
pub struct SqliteFileHistory {
    pool: DbPool,
}

impl SqliteFileHistory {
    /// Open (or create) the history database at `db_path`.
    pub fn new(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let store = Self { pool };
        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> AppResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS file_versions (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                path TEXT NOT NULL,
                version INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(session_id, path, version)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_file_versions_session_path
             ON file_versions(session_id, path)",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    fn insert_version(
        &self,
        session_id: &str,
        path: &str,
        content: &str,
        must_be_first: bool,
    ) -> AppResult<FileVersion> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version), -1) + 1 FROM file_versions
             WHERE session_id = ?1 AND path = ?2",
            params![session_id, path],
            |row| row.get(0),
        )?;

        if must_be_first && next != 0 {
            return Err(AppError::database(format!(
                "Initial version already recorded for {} in session {}",
                path, session_id
            )));
        }

        let record = FileVersion {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            path: path.to_string(),
            version: next,
            content: content.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        tx.execute(
            "INSERT INTO file_versions (id, session_id, path, version, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.session_id,
                record.path,
                record.version,
                record.content,
                record.created_at
            ],
        )?;
        tx.commit()?;

        Ok(record)
    }

    fn row_to_version(row: &rusqlite::Row) -> rusqlite::Result<FileVersion> {
        Ok(FileVersion {
            id: row.get(0)?,
            session_id: row.get(1)?,
            path: row.get(2)?,
            version: row.get(3)?,
            content: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FileHistoryService for SqliteFileHistory {
    fn get_by_path_and_session(
        &self,
        session_id: &str,
        path: &str,
    ) -> AppResult<Option<FileVersion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, path, version, content, created_at
             FROM file_versions
             WHERE session_id = ?1 AND path = ?2
             ORDER BY version DESC
             LIMIT 1",
        )?;

        let mut rows = stmt.query_map(params![session_id, path], Self::row_to_version)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn create(&self, session_id: &str, path: &str, content: &str) -> AppResult<FileVersion> {
        self.insert_version(session_id, path, content, true)
    }

    fn create_version(
        &self,
        session_id: &str,
        path: &str,
        content: &str,
    ) -> AppResult<FileVersion> {
        self.insert_version(session_id, path, content, false)
    }

    fn list_versions(&self, session_id: &str, path: &str) -> AppResult<Vec<FileVersion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, path, version, content, created_at
             FROM file_versions
             WHERE session_id = ?1 AND path = ?2
             ORDER BY version ASC",
        )?;

        let rows = stmt.query_map(params![session_id, path], Self::row_to_version)?;
        let mut versions = Vec::new();
        for row in rows {
            versions.push(row?);
        }
        Ok(versions)
    }
}
