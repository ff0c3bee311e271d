// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use idealab_config::model::StorageConfig;
use idealab_core::IdeaLabError;
use tracing::{debug, info};

use crate::migrations;

/// Handle to the single SQLite connection.
///
/// Query modules accept `&Database` and run their SQL inside
/// [`tokio_rusqlite::Connection::call`], so every statement executes on the
/// same background thread.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, IdeaLabError> {
        Self::open_with(&StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        })
        .await
    }

    /// Open the database described by `config` and run migrations.
    pub async fn open_with(config: &StorageConfig) -> Result<Self, IdeaLabError> {
        let path = Path::new(&config.database_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(IdeaLabError::store)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(IdeaLabError::store)?;
        let db = Self { conn };
        db.prepare(config.wal_mode).await?;
        info!(path = %config.database_path, wal = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema applied.
    pub async fn open_in_memory() -> Result<Self, IdeaLabError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(IdeaLabError::store)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), IdeaLabError> {
        self.conn
            .call(move |conn| -> Result<Result<(), IdeaLabError>, rusqlite::Error> {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
                }
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
                Ok(migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)??;
        debug!("schema migrations applied");
        Ok(())
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), IdeaLabError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(IdeaLabError::store)
    }
}

/// Convert a tokio-rusqlite error into a retryable store failure.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> IdeaLabError {
    IdeaLabError::store(e)
}

/// Whether `e` is a UNIQUE index violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("idealab.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_enables_wal_and_foreign_keys() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("pragmas.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let (mode, fk): (String, i64) = db
            .connection()
            .call(|conn| -> Result<_, rusqlite::Error> {
                let mode = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
                let fk = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?;
                Ok((mode, fk))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(fk, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();

        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        let applied: i64 = db
            .connection()
            .call(|conn| -> Result<_, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM refinery_schema_history", [], |r| {
                    r.get(0)
                })
            })
            .await
            .unwrap();
        assert_eq!(applied, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unique_violation_is_detected() {
        let db = Database::open_in_memory().await.unwrap();
        let detected = db
            .connection()
            .call(|conn| -> Result<bool, rusqlite::Error> {
                conn.execute("INSERT INTO users (username, email) VALUES ('a', 'a@x.io')", [])?;
                let dup =
                    conn.execute("INSERT INTO users (username, email) VALUES ('a', 'b@x.io')", []);
                Ok(dup.as_ref().is_err_and(is_unique_violation))
            })
            .await
            .unwrap();
        assert!(detected);
    }
}
