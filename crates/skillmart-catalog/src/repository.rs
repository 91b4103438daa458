//! Storage contract for skill records, plus an in-memory implementation.
//!
//! Backends implement [`SkillRepository`]; the resolver and publisher only
//! depend on the trait, so a real database can be swapped in without touching
//! catalog logic.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::slug::ExistenceCheck;
use crate::types::{NewSkill, SkillRecord, SkillUpdate};

/// CRUD over skill records keyed by slug.
#[async_trait]
pub trait SkillRepository: ExistenceCheck {
    /// Fetch a record by slug.
    async fn get(&self, slug: &str) -> Result<Option<SkillRecord>>;

    /// Insert a new record.
    ///
    /// Must fail with [`CatalogError::SlugTaken`] if the slug is already
    /// present, atomically with the write.
    async fn insert(&self, skill: NewSkill) -> Result<SkillRecord>;

    /// Apply a partial update, returning the updated record.
    async fn update(&self, slug: &str, update: SkillUpdate) -> Result<SkillRecord>;

    /// Delete a record, returning `true` if it existed.
    async fn delete(&self, slug: &str) -> Result<bool>;
}

/// Process-local repository backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemorySkillRepository {
    skills: DashMap<String, SkillRecord>,
}

impl MemorySkillRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[async_trait]
impl ExistenceCheck for MemorySkillRepository {
    async fn exists(&self, slug: &str) -> Result<bool> {
        Ok(self.skills.contains_key(slug))
    }
}

#[async_trait]
impl SkillRepository for MemorySkillRepository {
    async fn get(&self, slug: &str) -> Result<Option<SkillRecord>> {
        Ok(self.skills.get(slug).map(|r| r.value().clone()))
    }

    async fn insert(&self, skill: NewSkill) -> Result<SkillRecord> {
        match self.skills.entry(skill.slug.clone()) {
            Entry::Occupied(_) => Err(CatalogError::SlugTaken(skill.slug)),
            Entry::Vacant(slot) => {
                let record = skill.into_record();
                debug!(slug = %record.slug, id = %record.id, "skill inserted");
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn update(&self, slug: &str, update: SkillUpdate) -> Result<SkillRecord> {
        let mut entry = self
            .skills
            .get_mut(slug)
            .ok_or_else(|| CatalogError::NotFound {
                entity: "skill",
                id: slug.to_owned(),
            })?;
        update.apply_to(entry.value_mut());
        Ok(entry.value().clone())
    }

    async fn delete(&self, slug: &str) -> Result<bool> {
        Ok(self.skills.remove(slug).is_some())
    }
}
