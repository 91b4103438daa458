//! Create-skill flow: validate a draft, resolve a free slug, insert.
//!
//! The existence pre-check only reduces retry churn. The insert itself is
//! the uniqueness guarantee: if the store rejects the slug (another publisher
//! won the race) resolution resumes at the next attempt. The attempt budget
//! is shared between pre-check misses and rejected inserts.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{CatalogError, Result};
use crate::repository::SkillRepository;
use crate::slug::{DEFAULT_SLUG_LENGTH, SlugResolver, is_valid_slug, sanitize, slug_from_filename};
use crate::types::{Author, NewSkill, SkillRecord};

/// What the author submitted.
#[derive(Debug, Clone, Default)]
pub struct SkillDraft {
    pub name: String,
    /// Explicit slug; must already be well-formed when present.
    pub slug: Option<String>,
    pub description: String,
    pub version: Option<String>,
    pub tags: Vec<String>,
    /// File name of the uploaded package, for drafts built by
    /// [`SkillDraft::from_archive`].
    pub archive: Option<String>,
}

impl SkillDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Draft for a skill uploaded as an archive; name and slug come from
    /// the file name.
    pub fn from_archive(file_name: &str, description: impl Into<String>) -> Self {
        let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
        let slug = slug_from_filename(file_name);
        Self {
            name: stem.trim().to_owned(),
            slug: (!slug.is_empty()).then_some(slug),
            description: description.into(),
            archive: Some(file_name.to_owned()),
            ..Default::default()
        }
    }
}

/// A successfully published skill.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedSkill {
    pub record: SkillRecord,
    /// `true` when the stored slug differs from the sanitized request.
    pub slug_modified: bool,
}

/// Publishes drafts into a [`SkillRepository`].
pub struct SkillPublisher<R> {
    repo: R,
    resolver: SlugResolver,
    max_length: usize,
}

impl<R: SkillRepository> SkillPublisher<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            resolver: SlugResolver::default(),
            max_length: DEFAULT_SLUG_LENGTH,
        }
    }

    /// Override the resolver (attempt budget).
    pub fn with_resolver(mut self, resolver: SlugResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Override the length cap applied to the base slug.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Compute the base slug for a draft without touching the store.
    ///
    /// An explicit slug is used verbatim. It must be well-formed and fit
    /// within the configured length cap.
    pub fn base_slug(&self, draft: &SkillDraft) -> Result<String> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidInput(
                "skill name must not be empty".into(),
            ));
        }

        let base = match draft.slug.as_deref() {
            Some(explicit) => {
                if !is_valid_slug(explicit) {
                    return Err(CatalogError::InvalidInput(format!(
                        "`{explicit}` is not a valid slug (lowercase letters, digits and single hyphens)"
                    )));
                }
                if explicit.len() > self.max_length {
                    return Err(CatalogError::InvalidInput(format!(
                        "slug `{explicit}` is {} characters long; the limit is {}",
                        explicit.len(),
                        self.max_length
                    )));
                }
                explicit.to_owned()
            }
            None => sanitize(name, self.max_length),
        };

        if base.is_empty() {
            let message = match &draft.archive {
                Some(file_name) => format!(
                    "file name `{file_name}` has no characters usable in a slug"
                ),
                None => {
                    format!("`{name}` does not contain any letters or digits usable in a slug")
                }
            };
            return Err(CatalogError::InvalidInput(message));
        }
        Ok(base)
    }

    /// Publish `draft` on behalf of `author`.
    #[instrument(skip(self, draft), fields(author = %author.id, name = %draft.name))]
    pub async fn publish(&self, draft: SkillDraft, author: &Author) -> Result<PublishedSkill> {
        let base = self.base_slug(&draft)?;
        let username = author.username.as_deref();

        let mut start = 0;
        loop {
            let resolution = self
                .resolver
                .resolve_from(&self.repo, &base, username, start)
                .await?;

            let new_skill = NewSkill {
                slug: resolution.slug.clone(),
                name: draft.name.trim().to_owned(),
                description: draft.description.clone(),
                author_id: author.id.clone(),
                author_username: author.username.clone(),
                version: draft.version.clone(),
                tags: draft.tags.clone(),
            };

            match self.repo.insert(new_skill).await {
                Ok(record) => {
                    info!(slug = %record.slug, modified = resolution.modified, "skill published");
                    return Ok(PublishedSkill {
                        record,
                        slug_modified: resolution.modified,
                    });
                }
                Err(CatalogError::SlugTaken(slug)) => {
                    warn!(
                        slug = %slug,
                        attempt = resolution.attempt,
                        "slug claimed concurrently, resuming resolution"
                    );
                    start = resolution.attempt + 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
