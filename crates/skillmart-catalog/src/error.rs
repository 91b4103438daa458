//! Error types for the skill catalog.

/// Catalog-level errors.
///
/// Everything the catalog can report to a caller goes through this type;
/// collaborator failures are boxed into [`CatalogError::Store`] so the pure
/// logic never depends on a concrete storage backend.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no free slug for `{base}` after {attempts} attempts (try `{suggestion}`)")]
    SlugExhausted {
        base: String,
        attempts: u32,
        /// Advisory fallback; not guaranteed to be free.
        suggestion: String,
    },

    #[error("slug `{0}` is already taken")]
    SlugTaken(String),

    #[error("{entity} not found: `{id}`")]
    NotFound { entity: &'static str, id: String },

    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CatalogError {
    /// Wrap any collaborator error.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CatalogError>;
