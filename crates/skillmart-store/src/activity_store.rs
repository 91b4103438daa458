//! Per-user activity: installs, usage and reviews.
//!
//! Also the source of profile statistics. Counters are aggregated with SQL on
//! every call; nothing derived is cached or persisted.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use skillmart_catalog::{ProfileCounters, ProfileStats, RatedSkill};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

/// A user's review of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub skill_slug: String,
    pub user_id: String,
    /// 1 to 5 stars.
    pub rating: u8,
    pub body: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Install/usage/review bookkeeping plus profile counters.
#[derive(Clone)]
pub struct ActivityStore {
    db: Database,
}

impl ActivityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Install a skill for a user. Returns `false` if it was already
    /// installed; the skill's lifetime install count only grows on a new
    /// install.
    #[instrument(skip(self))]
    pub async fn record_install(&self, user_id: &str, slug: &str) -> StoreResult<bool> {
        let user_id = user_id.to_owned();
        let slug = slug.to_owned();
        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                let skill_id = skill_id(&tx, &slug)?;
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO skill_installs (user_id, skill_id, usage_count, installed_at) \
                     VALUES (?1, ?2, 0, ?3)",
                    rusqlite::params![user_id, skill_id, chrono::Utc::now().timestamp()],
                )?;
                if inserted > 0 {
                    tx.execute(
                        "UPDATE skills SET install_count = install_count + 1 WHERE id = ?1",
                        [&skill_id],
                    )?;
                }
                tx.commit()?;
                debug!(user = %user_id, slug = %slug, new = inserted > 0, "install recorded");
                Ok(inserted > 0)
            })
            .await
    }

    /// Remove an install. Returns `true` if one existed.
    #[instrument(skip(self))]
    pub async fn uninstall(&self, user_id: &str, slug: &str) -> StoreResult<bool> {
        let user_id = user_id.to_owned();
        let slug = slug.to_owned();
        self.db
            .execute(move |conn| {
                let skill_id = skill_id(conn, &slug)?;
                let deleted = conn.execute(
                    "DELETE FROM skill_installs WHERE user_id = ?1 AND skill_id = ?2",
                    [&user_id, &skill_id],
                )?;
                Ok(deleted > 0)
            })
            .await
    }

    /// Bump the usage counter of an installed skill, returning the new value.
    #[instrument(skip(self))]
    pub async fn record_usage(&self, user_id: &str, slug: &str) -> StoreResult<u64> {
        let user_id = user_id.to_owned();
        let slug = slug.to_owned();
        self.db
            .execute(move |conn| {
                let skill_id = skill_id(conn, &slug)?;
                let usage: Option<i64> = conn
                    .query_row(
                        "UPDATE skill_installs SET usage_count = usage_count + 1, last_used_at = ?3 \
                         WHERE user_id = ?1 AND skill_id = ?2 RETURNING usage_count",
                        rusqlite::params![user_id, skill_id, chrono::Utc::now().timestamp()],
                        |row| row.get(0),
                    )
                    .optional()?;
                usage
                    .map(|n| n.max(0) as u64)
                    .ok_or_else(|| StoreError::NotFound {
                        entity: "install",
                        id: format!("{user_id}/{slug}"),
                    })
            })
            .await
    }

    /// Create or replace the user's review of a skill and refresh the
    /// skill's aggregate rating.
    #[instrument(skip(self, body))]
    pub async fn add_review(
        &self,
        user_id: &str,
        slug: &str,
        rating: u8,
        body: Option<&str>,
    ) -> StoreResult<Review> {
        if !(1..=5).contains(&rating) {
            return Err(StoreError::InvalidArgument(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }

        let user_id = user_id.to_owned();
        let slug = slug.to_owned();
        let body = body.map(str::to_owned);
        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                let skill_id = skill_id(&tx, &slug)?;
                let now = chrono::Utc::now().timestamp();

                let (id, created_at): (String, i64) = tx.query_row(
                    "INSERT INTO reviews (id, skill_id, user_id, rating, body, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
                     ON CONFLICT(skill_id, user_id) DO UPDATE SET \
                         rating = excluded.rating, body = excluded.body, updated_at = excluded.updated_at \
                     RETURNING id, created_at",
                    rusqlite::params![
                        Uuid::now_v7().to_string(),
                        skill_id,
                        user_id,
                        rating,
                        body,
                        now
                    ],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;

                tx.execute(
                    "UPDATE skills SET \
                         rating = (SELECT COALESCE(AVG(rating), 0) FROM reviews WHERE skill_id = ?1), \
                         rating_count = (SELECT COUNT(*) FROM reviews WHERE skill_id = ?1) \
                     WHERE id = ?1",
                    [&skill_id],
                )?;
                tx.commit()?;

                debug!(user = %user_id, slug = %slug, rating, "review saved");
                Ok(Review {
                    id,
                    skill_slug: slug,
                    user_id,
                    rating,
                    body,
                    created_at,
                    updated_at: now,
                })
            })
            .await
    }

    /// Raw counters behind a user's achievements.
    #[instrument(skip(self))]
    pub async fn profile_counters(&self, user_id: &str) -> StoreResult<ProfileCounters> {
        let user_id = user_id.to_owned();
        self.db
            .execute(move |conn| {
                let count = |sql: &str| -> StoreResult<u64> {
                    let n: i64 = conn.query_row(sql, [&user_id], |row| row.get(0))?;
                    Ok(n.max(0) as u64)
                };
                Ok(ProfileCounters {
                    installed_count: count(
                        "SELECT COUNT(*) FROM skill_installs WHERE user_id = ?1",
                    )?,
                    usage_count: count(
                        "SELECT COALESCE(SUM(usage_count), 0) FROM skill_installs WHERE user_id = ?1",
                    )?,
                    created_count: count("SELECT COUNT(*) FROM skills WHERE author_id = ?1")?,
                    total_installs: count(
                        "SELECT COALESCE(SUM(install_count), 0) FROM skills WHERE author_id = ?1",
                    )?,
                    review_count: count("SELECT COUNT(*) FROM reviews WHERE user_id = ?1")?,
                })
            })
            .await
    }

    /// Rating and rating count for each skill authored by `user_id`.
    #[instrument(skip(self))]
    pub async fn authored_ratings(&self, user_id: &str) -> StoreResult<Vec<RatedSkill>> {
        let user_id = user_id.to_owned();
        self.db
            .execute(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT rating, rating_count FROM skills WHERE author_id = ?1")?;
                let rows = stmt.query_map([&user_id], |row| {
                    let rating: f64 = row.get(0)?;
                    let count: i64 = row.get(1)?;
                    Ok(RatedSkill {
                        rating,
                        rating_count: count.max(0) as u64,
                    })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }
}

#[async_trait]
impl ProfileStats for ActivityStore {
    async fn counters(&self, user_id: &str) -> skillmart_catalog::Result<ProfileCounters> {
        Ok(self.profile_counters(user_id).await?)
    }

    async fn authored_ratings(&self, user_id: &str) -> skillmart_catalog::Result<Vec<RatedSkill>> {
        Ok(ActivityStore::authored_ratings(self, user_id).await?)
    }
}

fn skill_id(conn: &Connection, slug: &str) -> StoreResult<String> {
    conn.query_row("SELECT id FROM skills WHERE slug = ?1", [slug], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or_else(|| StoreError::NotFound {
        entity: "skill",
        id: slug.to_owned(),
    })
}
