// Storage errors
//
// Absence is reported through Option/bool return values, not errors.

use marketplace_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violation
    #[error("{0}")]
    Conflict(String),

    /// Referenced ids that do not exist
    #[error("unknown references: {}", .0.join(", "))]
    InvalidReference(Vec<String>),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::InvalidReference(ids) => DomainError::InvalidReference(ids),
            StoreError::Database(e) => DomainError::Internal(anyhow::Error::new(e)),
            StoreError::Internal(e) => DomainError::Internal(e),
        }
    }
}

/// Map a unique violation to `Conflict(message)`, pass anything else through.
pub(crate) fn unique_violation(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Database(err),
    }
}
