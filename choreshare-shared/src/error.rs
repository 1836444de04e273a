/// Storage error type
///
/// Every repository implementation reports failures through `StorageError`.
/// Callers distinguish the semantic cases (`NotFound`, `Conflict`) from
/// transport failures, which they log and flatten.
///
/// `AlreadyAssigned` is kept apart from `Conflict`: name collisions are the
/// caller's fault, while an assignment collision means another writer
/// changed the group underneath a distribution run.

use thiserror::Error;

use crate::models::ChoreId;

/// Result type for repository operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the persistence layer
#[derive(Debug, Error)]
pub enum StorageError {
    /// Requested record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Write violates a uniqueness constraint
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Chore already has a current assignment
    #[error("Chore {0} is already assigned")]
    AlreadyAssigned(ChoreId),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend temporarily unable to serve the request
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Builds a `NotFound` error for any displayable ID
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
