//! Slug sanitization and uniqueness resolution.
//!
//! Every published skill is addressed by a URL-safe slug. The resolver
//! prefers the slug derived from the author's chosen name and falls back to
//! disambiguated variants (`{base}-{username}`, `{base}-{username}-{n}` or
//! `{base}-{n}`) until the [`ExistenceCheck`] collaborator reports a free one
//! or the attempt budget runs out.
//!
//! The pre-check is advisory. Two concurrent publishers can both see the same
//! slug as free; the store's unique constraint is what actually guarantees
//! uniqueness, and [`crate::publish::SkillPublisher`] resumes resolution when
//! an insert is rejected.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};

/// Number of candidates tried before giving up.
pub const MAX_SLUG_ATTEMPTS: u32 = 10;

/// Default length cap applied when sanitizing a skill name.
pub const DEFAULT_SLUG_LENGTH: usize = 50;

/// Length cap applied to the username part of a candidate.
pub const USERNAME_SLUG_LENGTH: usize = 20;

/// Longest slug accepted by [`is_valid_slug`].
pub const MAX_SLUG_LENGTH: usize = 100;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("separator regex is valid"));

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("disallowed-char regex is valid"));

static HYPHEN_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("hyphen regex is valid"));

static VALID_SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug validation regex is valid")
});

// ── pure helpers ─────────────────────────────────────────────────────

/// Turn arbitrary text into a slug of at most `max_length` characters.
///
/// Never fails: input with no usable characters yields an empty string,
/// which callers must reject before attempting resolution.
pub fn sanitize(text: &str, max_length: usize) -> String {
    let lowered = text.to_lowercase();
    let hyphenated = SEPARATOR_RUN.replace_all(lowered.trim(), "-");
    let stripped = DISALLOWED.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUN.replace_all(&stripped, "-");

    let mut slug = collapsed.trim_matches('-').to_owned();
    if slug.len() > max_length {
        // Only ASCII survives the filters above, so byte and char
        // boundaries coincide.
        slug.truncate(max_length);
        let kept = slug.trim_end_matches('-').len();
        slug.truncate(kept);
    }
    slug
}

/// Build the candidate slug for a given attempt.
///
/// Attempt 0 is always the base slug itself.
pub fn candidate(base: &str, username: Option<&str>, attempt: u32) -> String {
    if attempt == 0 {
        return base.to_owned();
    }

    let clean_username = username
        .map(|name| sanitize(name, USERNAME_SLUG_LENGTH))
        .filter(|name| !name.is_empty());

    match clean_username {
        Some(user) if attempt == 1 => format!("{base}-{user}"),
        Some(user) => format!("{base}-{user}-{attempt}"),
        None => format!("{base}-{attempt}"),
    }
}

/// Return `true` for a well-formed slug no longer than [`MAX_SLUG_LENGTH`].
///
/// Used for slugs that bypass [`sanitize`], e.g. typed directly by a user.
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_LENGTH && VALID_SLUG.is_match(slug)
}

/// Derive a slug from an uploaded package's file name.
///
/// The final extension is dropped (`My Skill.zip` → `my-skill`).
pub fn slug_from_filename(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    };
    sanitize(stem, DEFAULT_SLUG_LENGTH)
}

/// Advisory fallback offered when resolution is exhausted.
///
/// Includes the current Unix time in milliseconds, so it is very likely but
/// not guaranteed to be free.
pub fn fallback_suggestion(base: &str, username: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let clean_username = username
        .map(|name| sanitize(name, USERNAME_SLUG_LENGTH))
        .filter(|name| !name.is_empty());

    match clean_username {
        Some(user) => format!("{base}-{user}-{millis}"),
        None => format!("{base}-{millis}"),
    }
}

// ── collaborator ─────────────────────────────────────────────────────

/// Answers whether a slug is already used by a skill record.
///
/// Matching is exact and case-sensitive on the sanitized value.
/// Read-committed consistency is enough.
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    async fn exists(&self, slug: &str) -> Result<bool>;
}

// ── resolver ─────────────────────────────────────────────────────────

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugResolution {
    /// The free slug.
    pub slug: String,

    /// `true` when the slug differs from the sanitized base.
    pub modified: bool,

    /// Which attempt produced the slug (0-based).
    pub attempt: u32,
}

/// Finds a free slug by probing candidates in order.
#[derive(Debug, Clone, Copy)]
pub struct SlugResolver {
    max_attempts: u32,
}

impl Default for SlugResolver {
    fn default() -> Self {
        Self {
            max_attempts: MAX_SLUG_ATTEMPTS,
        }
    }
}

impl SlugResolver {
    /// Create a resolver with a custom attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Number of candidates tried before resolution gives up.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Resolve a free slug for `base`, starting from attempt 0.
    pub async fn resolve<C>(
        &self,
        check: &C,
        base: &str,
        username: Option<&str>,
    ) -> Result<SlugResolution>
    where
        C: ExistenceCheck + ?Sized,
    {
        self.resolve_from(check, base, username, 0).await
    }

    /// Resolve a free slug, skipping attempts below `start_attempt`.
    ///
    /// `base` must already be a sanitized slug (see [`sanitize`]); it is
    /// only checked for emptiness, plus a debug assertion.
    ///
    /// Each attempt issues exactly one existence check. A failing check
    /// aborts the loop and is returned unchanged.
    pub async fn resolve_from<C>(
        &self,
        check: &C,
        base: &str,
        username: Option<&str>,
        start_attempt: u32,
    ) -> Result<SlugResolution>
    where
        C: ExistenceCheck + ?Sized,
    {
        if base.is_empty() {
            return Err(CatalogError::InvalidInput(
                "slug must contain at least one letter or digit".into(),
            ));
        }
        debug_assert!(is_valid_slug(base), "unsanitized base slug `{base}`");

        let mut attempt = start_attempt;
        while attempt < self.max_attempts {
            let slug = candidate(base, username, attempt);
            if !check.exists(&slug).await? {
                debug!(slug = %slug, attempt, "resolved free slug");
                return Ok(SlugResolution {
                    slug,
                    modified: attempt > 0,
                    attempt,
                });
            }
            debug!(slug = %slug, attempt, "slug taken, trying next candidate");
            attempt += 1;
        }

        let suggestion = fallback_suggestion(base, username);
        warn!(
            base = %base,
            attempts = self.max_attempts,
            suggestion = %suggestion,
            "slug resolution exhausted"
        );
        Err(CatalogError::SlugExhausted {
            base: base.to_owned(),
            attempts: self.max_attempts,
            suggestion,
        })
    }
}

// ── tests ────────────────────────────────────────────────────────────
