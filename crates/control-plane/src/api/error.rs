// Mapping of domain errors to HTTP responses
//
// Internal failures are logged here and replaced with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marketplace_core::DomainError;

use super::common::ErrorResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(message),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(issues) => Self {
                status: StatusCode::BAD_REQUEST,
                body: ErrorResponse::with_issues("Invalid request", issues),
            },
            DomainError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            DomainError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            e @ (DomainError::InvalidOtp
            | DomainError::OtpExpired
            | DomainError::InvalidReference(_)) => Self::bad_request(e.to_string()),
            DomainError::Unauthorized(msg) => Self::new(StatusCode::UNAUTHORIZED, msg),
            DomainError::Forbidden(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            DomainError::Mail(e) => {
                tracing::error!("Failed to send email: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send OTP email")
            }
            DomainError::Storage(e) => {
                tracing::error!("Upload failed: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
            }
            DomainError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use marketplace_core::ValidationIssue;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::conflict("User already exists"), StatusCode::CONFLICT),
            (DomainError::not_found("Tag"), StatusCode::NOT_FOUND),
            (DomainError::InvalidOtp, StatusCode::BAD_REQUEST),
            (DomainError::OtpExpired, StatusCode::BAD_REQUEST),
            (
                DomainError::InvalidReference(vec!["x".into()]),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::Unauthorized("nope".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (DomainError::Forbidden("nope".into()), StatusCode::FORBIDDEN),
            (
                DomainError::Mail("smtp down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                DomainError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = ApiError::from(DomainError::Internal(anyhow::anyhow!("password=hunter2")));
        assert_eq!(err.body.error, "Internal server error");
    }

    #[test]
    fn test_validation_carries_issues() {
        let err = ApiError::from(DomainError::Validation(vec![ValidationIssue::new(
            "title",
            "Title is required",
        )]));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.errors.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_invalid_reference_message() {
        let err = ApiError::from(DomainError::InvalidReference(vec!["a".into(), "b".into()]));
        assert_eq!(err.body.error, "Invalid tag IDs: a, b");
    }
}
