//! SQLite connection handle.
//!
//! One `rusqlite::Connection` per [`Database`], shared behind a mutex.
//! Queries are closures shipped to tokio's blocking pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::migration;

/// Busy timeout for writers waiting on the WAL lock, in milliseconds.
const BUSY_TIMEOUT_MS: i32 = 5_000;

/// Cloneable handle to the marketplace database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    location: Arc<Location>,
}

enum Location {
    File(PathBuf),
    Memory,
}

impl Database {
    /// Open or create the database file at `path`, creating missing parent
    /// directories. Blocking.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                StoreError::InvalidArgument(format!(
                    "cannot create database directory {}: {e}",
                    dir.display()
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        configure(&conn, true)?;
        info!(path = %path.display(), "database opened");
        Ok(Self::wrap(conn, Location::File(path.to_path_buf())))
    }

    /// Private in-memory database; gone when the last clone drops.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn, false)?;
        debug!("in-memory database opened");
        Ok(Self::wrap(conn, Location::Memory))
    }

    /// Open the file on the blocking pool and bring the schema up to date.
    pub async fn open_and_migrate(path: impl AsRef<Path> + Send + 'static) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let db = tokio::task::spawn_blocking(move || Self::open(path)).await??;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn in_memory_migrated() -> StoreResult<Self> {
        let db = Self::open_in_memory()?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        self.execute(migration::run_all).await
    }

    /// Highest applied migration, 0 for an empty file.
    pub async fn schema_version(&self) -> StoreResult<u32> {
        self.execute(migration::current_version).await
    }

    /// Backing file, or `None` for an in-memory database.
    pub fn path(&self) -> Option<&Path> {
        match self.location.as_ref() {
            Location::File(path) => Some(path.as_path()),
            Location::Memory => None,
        }
    }

    /// Run `f` with shared access to the connection.
    ///
    /// ```ignore
    /// let n: i64 = db
    ///     .execute(|conn| Ok(conn.query_row("SELECT count(*) FROM reviews", [], |r| r.get(0))?))
    ///     .await?;
    /// ```
    pub async fn execute<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.execute_mut(move |conn| f(&*conn)).await
    }

    /// Run `f` with exclusive access, e.g. to open a `conn.transaction()`.
    pub async fn execute_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let shared = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = shared
                .lock()
                .map_err(|_| StoreError::TaskJoin("database mutex poisoned".into()))?;
            f(&mut conn)
        })
        .await?
    }

    fn wrap(conn: Connection, location: Location) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Arc::new(location),
        }
    }
}

/// Per-connection settings. WAL only applies to files.
fn configure(conn: &Connection, on_disk: bool) -> StoreResult<()> {
    if on_disk {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    debug!(on_disk, "connection configured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pragma(db: &Database, name: &'static str) -> String {
        db.execute(move |conn| {
            Ok(conn.query_row(&format!("PRAGMA {name}"), [], |row| {
                row.get::<_, rusqlite::types::Value>(0)
            })?)
        })
        .await
        .map(|value| match value {
            rusqlite::types::Value::Integer(i) => i.to_string(),
            rusqlite::types::Value::Text(s) => s,
            other => format!("{other:?}"),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn cascades_need_foreign_keys() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(pragma(&db, "foreign_keys").await, "1");
        assert!(db.path().is_none());
    }

    #[tokio::test]
    async fn file_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("market.db");
        let db = Database::open(&path).unwrap();

        assert_eq!(pragma(&db, "journal_mode").await.to_lowercase(), "wal");
        assert_eq!(db.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn migrated_database_reports_latest_version() {
        let db = Database::in_memory_migrated().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migration::LATEST_VERSION);

        // Running again is a no-op.
        db.run_migrations().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migration::LATEST_VERSION);
    }

    #[tokio::test]
    async fn failed_transaction_leaves_no_rows() {
        let db = Database::in_memory_migrated().await.unwrap();
        let result: StoreResult<()> = db
            .execute_mut(|conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO skills (id, slug, name, author_id, created_at, updated_at) \
                     VALUES ('s1', 'half-done', 'Half', 'u', 0, 0)",
                    [],
                )?;
                // Same slug again violates UNIQUE; tx drops uncommitted.
                tx.execute(
                    "INSERT INTO skills (id, slug, name, author_id, created_at, updated_at) \
                     VALUES ('s2', 'half-done', 'Half', 'u', 0, 0)",
                    [],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await;
        assert!(result.is_err());

        let count: i64 = db
            .execute(|conn| Ok(conn.query_row("SELECT count(*) FROM skills", [], |r| r.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
