//! SQLite-backed skill records.
//!
//! [`SkillStore`] is the production [`SkillRepository`]: slug uniqueness is
//! enforced by the `UNIQUE` constraint on `skills.slug`, and a violation is
//! surfaced as [`CatalogError::SlugTaken`] so the publisher can resume
//! resolution.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row};
use skillmart_catalog::{
    CatalogError, ExistenceCheck, NewSkill, SkillRecord, SkillRepository, SkillUpdate,
};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, is_unique_violation};

const SKILL_COLUMNS: &str = "id, slug, name, description, author_id, author_username, version, \
                             tags, install_count, rating, rating_count, created_at, updated_at";

/// CRUD over the `skills` table.
#[derive(Clone)]
pub struct SkillStore {
    db: Database,
}

impl SkillStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Whether any skill uses exactly `slug`.
    #[instrument(skip(self))]
    pub async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        let slug = slug.to_owned();
        self.db
            .execute(move |conn| {
                let found: Option<i64> = conn
                    .query_row("SELECT 1 FROM skills WHERE slug = ?1", [&slug], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(found.is_some())
            })
            .await
    }

    /// Fetch a skill by slug, returning `None` if not found.
    #[instrument(skip(self))]
    pub async fn get(&self, slug: &str) -> StoreResult<Option<SkillRecord>> {
        let slug = slug.to_owned();
        self.db.execute(move |conn| fetch(conn, &slug)).await
    }

    /// Insert a new skill. Fails with [`StoreError::Conflict`] if the slug is
    /// already taken.
    #[instrument(skip(self, skill), fields(slug = %skill.slug))]
    pub async fn insert(&self, skill: NewSkill) -> StoreResult<SkillRecord> {
        let record = skill.into_record();
        self.db
            .execute(move |conn| {
                let tags = serde_json::to_string(&record.tags)?;
                conn.execute(
                    "INSERT INTO skills (id, slug, name, description, author_id, author_username, \
                     version, tags, install_count, rating, rating_count, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, 0, ?9, ?9)",
                    rusqlite::params![
                        record.id,
                        record.slug,
                        record.name,
                        record.description,
                        record.author_id,
                        record.author_username,
                        record.version,
                        tags,
                        record.created_at,
                    ],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::Conflict {
                            entity: "skill",
                            key: record.slug.clone(),
                        }
                    } else {
                        StoreError::Sqlite(e)
                    }
                })?;
                debug!(id = %record.id, slug = %record.slug, "skill inserted");
                Ok(record)
            })
            .await
    }

    /// Apply a partial update and return the stored result.
    #[instrument(skip(self, update))]
    pub async fn update(&self, slug: &str, update: SkillUpdate) -> StoreResult<SkillRecord> {
        let slug = slug.to_owned();
        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                let mut record = fetch(&tx, &slug)?.ok_or_else(|| StoreError::NotFound {
                    entity: "skill",
                    id: slug.clone(),
                })?;
                if update.is_empty() {
                    return Ok(record);
                }

                update.apply_to(&mut record);
                tx.execute(
                    "UPDATE skills SET name = ?2, description = ?3, version = ?4, tags = ?5, \
                     updated_at = ?6 WHERE id = ?1",
                    rusqlite::params![
                        record.id,
                        record.name,
                        record.description,
                        record.version,
                        serde_json::to_string(&record.tags)?,
                        record.updated_at,
                    ],
                )?;
                tx.commit()?;
                debug!(slug = %record.slug, "skill updated");
                Ok(record)
            })
            .await
    }

    /// Delete a skill (and, by cascade, its installs and reviews).
    #[instrument(skip(self))]
    pub async fn delete(&self, slug: &str) -> StoreResult<bool> {
        let slug = slug.to_owned();
        self.db
            .execute(move |conn| {
                let deleted = conn.execute("DELETE FROM skills WHERE slug = ?1", [&slug])?;
                Ok(deleted > 0)
            })
            .await
    }

    /// All skills published by `author_id`, newest first.
    #[instrument(skip(self))]
    pub async fn list_by_author(&self, author_id: &str) -> StoreResult<Vec<SkillRecord>> {
        let author_id = author_id.to_owned();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SKILL_COLUMNS} FROM skills WHERE author_id = ?1 \
                     ORDER BY created_at DESC, slug ASC"
                ))?;
                let rows = stmt.query_map([&author_id], SkillRow::from_row)?;
                rows.map(|row| row?.into_record()).collect()
            })
            .await
    }
}

// ── catalog trait impls ──────────────────────────────────────────────

#[async_trait]
impl ExistenceCheck for SkillStore {
    async fn exists(&self, slug: &str) -> skillmart_catalog::Result<bool> {
        Ok(self.slug_exists(slug).await?)
    }
}

#[async_trait]
impl SkillRepository for SkillStore {
    async fn get(&self, slug: &str) -> skillmart_catalog::Result<Option<SkillRecord>> {
        Ok(SkillStore::get(self, slug).await?)
    }

    async fn insert(&self, skill: NewSkill) -> skillmart_catalog::Result<SkillRecord> {
        SkillStore::insert(self, skill)
            .await
            .map_err(CatalogError::from)
    }

    async fn update(
        &self,
        slug: &str,
        update: SkillUpdate,
    ) -> skillmart_catalog::Result<SkillRecord> {
        Ok(SkillStore::update(self, slug, update).await?)
    }

    async fn delete(&self, slug: &str) -> skillmart_catalog::Result<bool> {
        Ok(SkillStore::delete(self, slug).await?)
    }
}

// ── row mapping ──────────────────────────────────────────────────────

pub(crate) fn fetch(conn: &Connection, slug: &str) -> StoreResult<Option<SkillRecord>> {
    let row = conn
        .query_row(
            &format!("SELECT {SKILL_COLUMNS} FROM skills WHERE slug = ?1"),
            [slug],
            SkillRow::from_row,
        )
        .optional()?;
    row.map(SkillRow::into_record).transpose()
}

/// Raw row; tags are still JSON text.
struct SkillRow {
    id: String,
    slug: String,
    name: String,
    description: String,
    author_id: String,
    author_username: Option<String>,
    version: Option<String>,
    tags: String,
    install_count: i64,
    rating: f64,
    rating_count: i64,
    created_at: i64,
    updated_at: i64,
}

impl SkillRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            slug: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            author_id: row.get(4)?,
            author_username: row.get(5)?,
            version: row.get(6)?,
            tags: row.get(7)?,
            install_count: row.get(8)?,
            rating: row.get(9)?,
            rating_count: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_record(self) -> StoreResult<SkillRecord> {
        Ok(SkillRecord {
            id: self.id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            author_id: self.author_id,
            author_username: self.author_username,
            version: self.version,
            tags: serde_json::from_str(&self.tags)?,
            install_count: self.install_count.max(0) as u64,
            rating: self.rating,
            rating_count: self.rating_count.max(0) as u64,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SkillStore {
        SkillStore::new(Database::in_memory_migrated().await.unwrap())
    }

    fn new_skill(slug: &str, author: &str) -> NewSkill {
        NewSkill {
            slug: slug.into(),
            name: "Commit Helper".into(),
            description: "Writes commit messages".into(),
            author_id: author.into(),
            author_username: Some("bob".into()),
            version: Some("1.0.0".into()),
            tags: vec!["git".into(), "productivity".into()],
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let store = store().await;
        let inserted = store.insert(new_skill("commit-helper", "u1")).await.unwrap();
        let fetched = store.get("commit-helper").await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.tags, vec!["git", "productivity"]);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exists_is_exact_match() {
        let store = store().await;
        store.insert(new_skill("commit-helper", "u1")).await.unwrap();
        assert!(store.slug_exists("commit-helper").await.unwrap());
        assert!(!store.slug_exists("Commit-Helper").await.unwrap());
        assert!(!store.slug_exists("commit").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_slug_is_conflict() {
        let store = store().await;
        store.insert(new_skill("dup", "u1")).await.unwrap();
        let err = store.insert(new_skill("dup", "u2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { entity: "skill", ref key } if key == "dup"));

        // Through the catalog trait the same failure is `SlugTaken`.
        let err = SkillRepository::insert(&store, new_skill("dup", "u3"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SlugTaken(ref s) if s == "dup"));
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let store = store().await;
        store.insert(new_skill("editable", "u1")).await.unwrap();

        let updated = store
            .update(
                "editable",
                SkillUpdate {
                    description: Some("Now with emoji".into()),
                    tags: Some(vec!["git".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "Now with emoji");
        assert_eq!(updated.name, "Commit Helper");

        let fetched = store.get("editable").await.unwrap().unwrap();
        assert_eq!(fetched.tags, vec!["git"]);
        assert_eq!(fetched.description, "Now with emoji");
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = store().await;
        let err = store
            .update("ghost", SkillUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "skill", .. }));
    }

    #[tokio::test]
    async fn delete_and_list_by_author() {
        let store = store().await;
        store.insert(new_skill("a-skill", "u1")).await.unwrap();
        store.insert(new_skill("b-skill", "u1")).await.unwrap();
        store.insert(new_skill("other", "u2")).await.unwrap();

        let mine = store.list_by_author("u1").await.unwrap();
        assert_eq!(mine.len(), 2);

        assert!(store.delete("a-skill").await.unwrap());
        assert!(!store.delete("a-skill").await.unwrap());
        assert_eq!(store.list_by_author("u1").await.unwrap().len(), 1);
    }
}
