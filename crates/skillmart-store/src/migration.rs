//! Versioned schema migrations.
//!
//! Each migration runs inside its own transaction and is recorded in the
//! `_migrations` table, so re-running is a no-op.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Latest schema version known to this build.
pub const LATEST_VERSION: u32 = 3;

/// All migrations in order. Append only.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "skills catalog with globally unique slugs",
        sql: r#"
            CREATE TABLE skills (
                id              TEXT PRIMARY KEY,
                slug            TEXT NOT NULL UNIQUE,
                name            TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                author_id       TEXT NOT NULL,
                author_username TEXT,
                version         TEXT,
                tags            TEXT NOT NULL DEFAULT '[]',
                install_count   INTEGER NOT NULL DEFAULT 0,
                rating          REAL NOT NULL DEFAULT 0,
                rating_count    INTEGER NOT NULL DEFAULT 0,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            );
            CREATE INDEX idx_skills_author ON skills(author_id);
        "#,
    },
    Migration {
        version: 2,
        description: "per-user installs with usage counters",
        sql: r#"
            CREATE TABLE skill_installs (
                user_id      TEXT NOT NULL,
                skill_id     TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
                usage_count  INTEGER NOT NULL DEFAULT 0,
                installed_at INTEGER NOT NULL,
                last_used_at INTEGER,
                PRIMARY KEY (user_id, skill_id)
            );
            CREATE INDEX idx_skill_installs_user ON skill_installs(user_id);
        "#,
    },
    Migration {
        version: 3,
        description: "reviews, one per user per skill",
        sql: r#"
            CREATE TABLE reviews (
                id         TEXT PRIMARY KEY,
                skill_id   TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
                user_id    TEXT NOT NULL,
                rating     INTEGER NOT NULL CHECK(rating BETWEEN 1 AND 5),
                body       TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (skill_id, user_id)
            );
            CREATE INDEX idx_reviews_user ON reviews(user_id);
        "#,
    },
];

/// Run all pending migrations. Synchronous; call from the blocking pool.
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        debug!(current_version = current, "database schema is up to date");
        return Ok(());
    }

    info!(current_version = current, pending = pending.len(), "running pending migrations");
    for migration in pending {
        apply(conn, migration)?;
    }
    info!(new_version = LATEST_VERSION, "all migrations applied");
    Ok(())
}

/// Latest applied migration version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    ensure_migrations_table(conn)?;
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
        row.get(0)
    })
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to read current version: {e}"),
    })
}

fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to create _migrations table: {e}"),
    })
}

fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    info!(version = migration.version, description = migration.description, "applying migration");

    let fail = |stage: &str, e: rusqlite::Error| StoreError::Migration {
        version: migration.version,
        message: format!("{stage}: {e}"),
    };

    // Dropping the transaction without commit rolls it back.
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| fail("failed to begin transaction", e))?;

    let result = tx
        .execute_batch(migration.sql)
        .map_err(|e| fail("SQL execution failed", e))
        .and_then(|()| {
            tx.execute(
                "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    migration.version,
                    migration.description,
                    chrono::Utc::now().timestamp()
                ],
            )
            .map_err(|e| fail("failed to record migration", e))
        });

    match result {
        Ok(_) => {
            tx.commit().map_err(|e| fail("failed to commit", e))?;
            debug!(version = migration.version, "migration applied");
            Ok(())
        }
        Err(err) => {
            warn!(version = migration.version, %err, "migration failed, rolling back");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        conn
    }

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
            )
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn migrations_are_ordered_and_latest_matches() {
        for window in MIGRATIONS.windows(2) {
            assert!(window[1].version > window[0].version);
        }
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(LATEST_VERSION));
    }

    #[test]
    fn run_all_on_fresh_db() {
        let conn = setup_conn();
        assert_eq!(current_version(&conn).unwrap(), 0);
        run_all(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
        assert_eq!(table_names(&conn), vec!["reviews", "skill_installs", "skills"]);
    }

    #[test]
    fn run_all_is_idempotent() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        run_all(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
    }

    #[test]
    fn slug_uniqueness_is_enforced() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        conn.execute(
            "INSERT INTO skills (id, slug, name, author_id, created_at, updated_at) \
             VALUES ('a', 'same', 'A', 'u', 0, 0)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO skills (id, slug, name, author_id, created_at, updated_at) \
             VALUES ('b', 'same', 'B', 'u', 0, 0)",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn review_rating_is_checked() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        conn.execute(
            "INSERT INTO skills (id, slug, name, author_id, created_at, updated_at) \
             VALUES ('s', 'skill', 'S', 'u', 0, 0)",
            [],
        )
        .unwrap();
        let bad = conn.execute(
            "INSERT INTO reviews (id, skill_id, user_id, rating, created_at, updated_at) \
             VALUES ('r', 's', 'u', 6, 0, 0)",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn deleting_skill_cascades() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO skills (id, slug, name, author_id, created_at, updated_at) \
                 VALUES ('s', 'skill', 'S', 'u', 0, 0);
             INSERT INTO skill_installs (user_id, skill_id, installed_at) VALUES ('u2', 's', 0);
             INSERT INTO reviews (id, skill_id, user_id, rating, created_at, updated_at) \
                 VALUES ('r', 's', 'u2', 4, 0, 0);
             DELETE FROM skills WHERE id = 's';",
        )
        .unwrap();
        let installs: i64 = conn
            .query_row("SELECT count(*) FROM skill_installs", [], |row| row.get(0))
            .unwrap();
        let reviews: i64 = conn
            .query_row("SELECT count(*) FROM reviews", [], |row| row.get(0))
            .unwrap();
        assert_eq!((installs, reviews), (0, 0));
    }
}
