// ⚠️ Error taxonomy for the vote core
// Validation problems are the caller's fault, storage problems are ours.

use std::fmt;

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// A rejected vote submission or lookup (missing id, same id twice, unknown id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, "Required field is missing")
    }

    pub fn same_entity(id: i64) -> Self {
        Self::new(
            "loserId",
            format!("Winner and loser cannot be the same Pokemon (id {})", id),
        )
    }

    pub fn out_of_range(field: &str, id: i64, max: usize) -> Self {
        Self::new(
            field,
            format!("Invalid Pokemon ID {} (expected 1..={})", id, max),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// VOTE ERROR
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    /// Malformed or semantically invalid request; never retried
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The SQLite medium could not be reached or a write did not complete
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// Pairing needs at least two entities
    #[error("insufficient catalog: need at least 2 entities, got {available}")]
    InsufficientCatalog { available: usize },

    /// Catalog file breaks the id/name rules
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

impl VoteError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, VoteError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, VoteError>;
