//! Catalog logic for SkillMart, a marketplace of AI skills.
//!
//! This crate provides:
//!
//! - **Slug resolution**: sanitizes skill names into URL-safe slugs and
//!   finds a free variant (`name`, `name-user`, `name-user-2`, ...) through an
//!   injected [`ExistenceCheck`].
//!
//! - **Publishing**: [`SkillPublisher`] validates a draft, resolves its slug
//!   and inserts it, resuming resolution if the store rejects the slug at
//!   commit time.
//!
//! - **Achievements**: a fixed catalog of twelve thresholds over five
//!   per-user counters, recomputed on every read.
//!
//! - **Ratings**: count-weighted average rating across authored skills.
//!
//! Storage is abstracted behind [`SkillRepository`] and [`ProfileStats`];
//! [`MemorySkillRepository`] is a process-local implementation, and the
//! `skillmart-store` crate provides the SQLite one.
//!
//! # Example
//!
//! ```rust,no_run
//! use skillmart_catalog::{Author, MemorySkillRepository, SkillDraft, SkillPublisher};
//!
//! # async fn run() -> skillmart_catalog::Result<()> {
//! let publisher = SkillPublisher::new(MemorySkillRepository::new());
//! let author = Author::new("user-1", Some("bob".into()));
//! let published = publisher
//!     .publish(SkillDraft::new("Commit Helper", "Writes commit messages"), &author)
//!     .await?;
//! assert_eq!(published.record.slug, "commit-helper");
//! # Ok(())
//! # }
//! ```

pub mod achievements;
pub mod error;
pub mod profile;
pub mod publish;
pub mod rating;
pub mod repository;
pub mod slug;
pub mod types;

pub use achievements::{
    ACHIEVEMENTS, AchievementDefinition, AchievementFamily, AchievementLabel, AchievementResult,
    Metric, ProfileCounters, compute_achievements,
};
pub use error::{CatalogError, Result};
pub use profile::{ProfileStats, ProfileSummary, load_profile, summarize};
pub use publish::{PublishedSkill, SkillDraft, SkillPublisher};
pub use rating::{RatedSkill, weighted_average_rating};
pub use repository::{MemorySkillRepository, SkillRepository};
pub use slug::{
    ExistenceCheck, MAX_SLUG_ATTEMPTS, SlugResolution, SlugResolver, is_valid_slug, sanitize,
    slug_from_filename,
};
pub use types::{Author, NewSkill, SkillRecord, SkillUpdate};
