// Domain errors shared by services and the HTTP layer
//
// Services return these; the API layer maps each variant to a status code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A single schema violation, addressed by field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ValidationIssue {
    /// Dotted path of the offending field (e.g. `details.githubRepo`).
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    /// Request body failed schema validation
    #[error("validation failed")]
    Validation(Vec<ValidationIssue>),

    /// Unique constraint would be violated (duplicate email, tag name)
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// No pending OTP for the user, or the presented code does not match
    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("OTP expired")]
    OtpExpired,

    /// One or more referenced ids do not exist
    #[error("Invalid tag IDs: {}", .0.join(", "))]
    InvalidReference(Vec<String>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Email delivery failed after state was persisted
    #[error("failed to send email: {0}")]
    Mail(String),

    /// Object storage relay failed
    #[error("upload failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid(path: &str, message: &str) -> Self {
        Self::Validation(vec![ValidationIssue::new(path, message)])
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
