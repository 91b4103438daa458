//! # skillmart-store
//!
//! SQLite persistence for SkillMart.
//!
//! Implements the catalog's collaborator traits on top of a single
//! WAL-mode connection:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  SkillStore     ExistenceCheck + Repository  │
//! │  ActivityStore  installs, reviews, stats     │
//! ├──────────────────────────────────────────────┤
//! │  Database (rusqlite WAL, spawn_blocking)     │
//! │  Migrations (versioned, transactional)       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use skillmart_catalog::{Author, SkillDraft, SkillPublisher};
//! use skillmart_store::{Database, SkillStore};
//!
//! let db = Database::open_and_migrate("data/skillmart.db").await?;
//! let publisher = SkillPublisher::new(SkillStore::new(db.clone()));
//! let published = publisher
//!     .publish(SkillDraft::new("Commit Helper", ""), &Author::new("u1", None))
//!     .await?;
//! ```

pub mod activity_store;
pub mod db;
pub mod error;
pub mod migration;
pub mod skill_store;

// ── re-exports ───────────────────────────────────────────────────────

pub use activity_store::{ActivityStore, Review};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use skill_store::SkillStore;
