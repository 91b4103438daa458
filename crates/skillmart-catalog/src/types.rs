//! Skill record types shared by the catalog and its storage backends.

use serde::{Deserialize, Serialize};

/// A published skill as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    /// Unique identifier (UUID v7).
    pub id: String,

    /// Globally unique URL slug (e.g. `git-commit-helper`).
    pub slug: String,

    /// Human-readable name as typed by the author.
    pub name: String,

    /// Short description of what the skill does.
    pub description: String,

    /// Identity of the publishing user.
    pub author_id: String,

    /// Author's handle at publish time, if any.
    pub author_username: Option<String>,

    /// Semantic version string (e.g. `1.2.0`).
    pub version: Option<String>,

    /// Tags for categorization and search.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Number of installs across all users.
    pub install_count: u64,

    /// Average review rating (0 when unrated).
    pub rating: f64,

    /// Number of reviews behind `rating`.
    pub rating_count: u64,

    /// Unix timestamp when the skill was published.
    pub created_at: i64,

    /// Unix timestamp of the last update.
    pub updated_at: i64,
}

/// Fields required to insert a new skill record.
///
/// The slug must already be resolved; the store enforces uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSkill {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub author_id: String,
    pub author_username: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewSkill {
    /// Materialize a full record with fresh id and timestamps.
    pub fn into_record(self) -> SkillRecord {
        let now = chrono::Utc::now().timestamp();
        SkillRecord {
            id: uuid::Uuid::now_v7().to_string(),
            slug: self.slug,
            name: self.name,
            description: self.description,
            author_id: self.author_id,
            author_username: self.author_username,
            version: self.version,
            tags: self.tags,
            install_count: 0,
            rating: 0.0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a skill's editable fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl SkillUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.version.is_none()
            && self.tags.is_none()
    }

    /// Apply this update to `record`, bumping `updated_at`.
    pub fn apply_to(&self, record: &mut SkillRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(version) = &self.version {
            record.version = Some(version.clone());
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        record.updated_at = chrono::Utc::now().timestamp();
    }
}

/// The identity publishing a skill, as resolved by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>, username: Option<String>) -> Self {
        Self {
            id: id.into(),
            username,
        }
    }
}
