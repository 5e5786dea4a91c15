// Common DTOs for public API
//
// These types are shared across multiple API endpoints. Every JSON body
// carries a `success` flag.

use marketplace_core::{DomainError, ValidationIssue};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Error message describing what went wrong.
    pub error: String,
    /// Field-level issues, present for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationIssue>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors: None,
        }
    }

    pub fn with_issues(error: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors: Some(issues),
        }
    }
}

/// Response carrying only a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Query flag parsing shared by list endpoints (`?includeTags=true`).
pub fn flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if v.eq_ignore_ascii_case("true") || v == "1")
}

/// Parse a resource id. An id that is not a UUID cannot exist.
pub fn parse_id(value: &str, entity: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(value.trim()).map_err(|_| DomainError::not_found(entity))
}
