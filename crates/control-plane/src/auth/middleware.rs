// Authentication extractors for the JSON API
// Decision: Accept both cookie-based (console) and header-based (API) sessions
// Decision: Only the most recently issued token of a user is accepted

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use marketplace_core::{DomainError, Role, UserProfile};
use serde::Serialize;
use uuid::Uuid;

use super::{config::AuthConfig, jwt::JwtService, TOKEN_COOKIE};
use crate::mail::Mailer;
use crate::services::AuthService;
use crate::storage::{StorageBackend, UserRow};

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub success: bool,
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            success: false,
            error: message.to_string(),
            status,
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Authenticated user context extracted from request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl From<UserRow> for AuthUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            role: row.role(),
            name: row.name,
            email: row.email,
        }
    }
}

/// Authenticated user with the ADMIN role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub jwt_service: Arc<JwtService>,
    pub service: Arc<AuthService>,
}

impl AuthState {
    pub fn new(config: AuthConfig, db: StorageBackend, mailer: Arc<dyn Mailer>) -> Self {
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
        let service = Arc::new(AuthService::new(
            db,
            jwt_service.clone(),
            mailer,
            config.otp_ttl,
        ));
        Self {
            config,
            jwt_service,
            service,
        }
    }
}

/// Session token presented with the request: `Authorization: Bearer` first,
/// then the `token` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Extractor for authenticated user
/// This is required - returns 401 if not authenticated
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let token = session_token(&parts.headers)
            .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;

        match auth_state.service.authenticate(&token).await {
            Ok(user) => Ok(AuthUser::from(user)),
            Err(DomainError::Unauthorized(msg)) => Err(AuthError::unauthorized(&msg)),
            Err(DomainError::NotFound(_)) => Err(AuthError::unauthorized("User not found")),
            Err(e) => {
                tracing::error!("Failed to authenticate request: {}", e);
                Err(AuthError::internal())
            }
        }
    }
}

/// Extractor for admin users
/// Returns 401 if not authenticated, 403 if not an admin
#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AuthError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}
