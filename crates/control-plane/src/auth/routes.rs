// Authentication HTTP routes
// Decision: Passwordless; signup and login both end in an emailed OTP
// Decision: The session travels in an http-only `token` cookie plus a
// script-readable `auth-status` marker for the console

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use marketplace_core::{DomainError, Role, UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    middleware::{session_token, AuthState, AuthUser},
    AUTH_STATUS_COOKIE, AUTH_STATUS_VALUE, TOKEN_COOKIE,
};
use crate::api::common::{ErrorResponse, MessageResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::validation::{normalize_email, Validator, MIN_NAME_CHARS};
use crate::services::auth::OtpChallenge;

/// Signup request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Login / existence-check request
#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: Option<String>,
}

/// OTP verification request. The code may be sent as a string or a number.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[schema(value_type = Option<String>)]
    pub otp: Option<serde_json::Value>,
    pub user_id: Option<String>,
}

/// User data returned after an OTP was issued
#[derive(Debug, Serialize, ToSchema)]
pub struct OtpIssuedData {
    pub userid: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpIssuedResponse {
    pub success: bool,
    pub message: String,
    pub response_data: OtpIssuedData,
}

impl OtpIssuedResponse {
    fn new(message: &str, challenge: OtpChallenge, expose_otp: bool) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            response_data: OtpIssuedData {
                userid: challenge.user.id,
                role: challenge.user.role(),
                name: challenge.user.name,
                email: challenge.user.email,
                otp: expose_otp.then_some(challenge.otp),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub response_data: String,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IsVerifiedResponse {
    pub success: bool,
    pub is_verified: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExistsResponse {
    pub success: bool,
    pub exists: bool,
}

/// Create auth routes
pub fn routes(state: AuthState) -> Router {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/otp", post(verify_otp))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/isverify", get(is_verify))
        .route("/api/auth/isexist", post(is_exist))
        .with_state(state)
}

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    http_only: bool,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Validate and normalize an email field.
fn required_email(v: &mut Validator, value: Option<&str>) -> Option<String> {
    let email = v.required("email", value)?;
    v.email("email", email);
    Some(normalize_email(email))
}

/// POST /api/auth/signup - Register and receive an OTP
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User created, OTP sent", body = OtpIssuedResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Email delivery failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AuthState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<OtpIssuedResponse>> {
    let mut v = Validator::new();
    let name = v.required("name", req.name.as_deref());
    if let Some(name) = name {
        v.min_chars("name", name, MIN_NAME_CHARS);
    }
    let email = required_email(&mut v, req.email.as_deref());
    v.finish()?;
    let (Some(name), Some(email)) = (name, email) else {
        return Err(ApiError::bad_request("Invalid request"));
    };

    let challenge = state.service.signup(name, &email).await?;
    Ok(Json(OtpIssuedResponse::new(
        "OTP sent to email",
        challenge,
        state.config.expose_otp,
    )))
}

/// POST /api/auth/login - Request a new OTP for an existing user
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "OTP sent", body = OtpIssuedResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Email delivery failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AuthState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<OtpIssuedResponse>> {
    let mut v = Validator::new();
    let email = required_email(&mut v, req.email.as_deref());
    v.finish()?;
    let Some(email) = email else {
        return Err(ApiError::bad_request("Invalid request"));
    };

    let challenge = state.service.login(&email).await?;
    Ok(Json(OtpIssuedResponse::new(
        "Login successful",
        challenge,
        state.config.expose_otp,
    )))
}

fn otp_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

/// POST /api/auth/otp - Verify an OTP and open a session
#[utoipa::path(
    post,
    path = "/api/auth/otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Verified, session cookies set", body = VerifyOtpResponse),
        (status = 400, description = "Missing fields, invalid or expired OTP", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(req): Json<VerifyOtpRequest>,
) -> ApiResult<(CookieJar, Json<VerifyOtpResponse>)> {
    let mut v = Validator::new();
    let otp = otp_text(req.otp.as_ref());
    if otp.is_none() {
        v.issue("otp", "otp is required");
    }
    let user_id = v.required("userId", req.user_id.as_deref());
    v.finish()?;
    let (Some(otp), Some(user_id)) = (otp, user_id) else {
        return Err(ApiError::bad_request("Invalid request"));
    };

    // An id that does not parse cannot have a pending OTP.
    let user_id = Uuid::parse_str(user_id).map_err(|_| DomainError::InvalidOtp)?;

    let session = state.service.verify_otp(user_id, &otp).await?;

    let max_age = state.config.token_lifetime_secs();
    let secure = state.config.cookie_secure;
    let jar = jar
        .add(session_cookie(
            TOKEN_COOKIE,
            session.token.clone(),
            max_age,
            true,
            secure,
        ))
        .add(session_cookie(
            AUTH_STATUS_COOKIE,
            AUTH_STATUS_VALUE.to_string(),
            max_age,
            false,
            secure,
        ));

    Ok((
        jar,
        Json(VerifyOtpResponse {
            success: true,
            response_data: "OTP verified successfully".to_string(),
            token: session.token,
        }),
    ))
}

/// POST /api/auth/logout - Clear session cookies
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Cookies cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AuthState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let secure = state.config.cookie_secure;
    let jar = jar
        .add(session_cookie(TOKEN_COOKIE, String::new(), 0, true, secure))
        .add(session_cookie(
            AUTH_STATUS_COOKIE,
            String::new(),
            0,
            false,
            secure,
        ));
    (jar, Json(MessageResponse::new("Logged out successfully")))
}

/// GET /api/auth/me - Current user profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: user.profile(),
    })
}

/// GET /api/auth/isverify - Verification status of the session user
#[utoipa::path(
    get,
    path = "/api/auth/isverify",
    responses(
        (status = 200, description = "Verification status", body = IsVerifiedResponse),
        (status = 401, description = "Missing, invalid or stale token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn is_verify(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> ApiResult<Json<IsVerifiedResponse>> {
    let token = session_token(&headers).ok_or_else(|| {
        ApiError::from(DomainError::Unauthorized(
            "Authentication required".to_string(),
        ))
    })?;
    let user = state.service.authenticate(&token).await?;
    Ok(Json(IsVerifiedResponse {
        success: true,
        is_verified: user.is_verified,
    }))
}

/// POST /api/auth/isexist - Whether an account exists for an email
#[utoipa::path(
    post,
    path = "/api/auth/isexist",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Existence flag", body = ExistsResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn is_exist(
    State(state): State<AuthState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<ExistsResponse>> {
    let mut v = Validator::new();
    let email = required_email(&mut v, req.email.as_deref());
    v.finish()?;
    let Some(email) = email else {
        return Err(ApiError::bad_request("Invalid request"));
    };

    let exists = state.service.email_exists(&email).await?;
    Ok(Json(ExistsResponse {
        success: true,
        exists,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(TOKEN_COOKIE, "abc".to_string(), 3600, true, false);
        let text = cookie.to_string();
        assert!(text.starts_with("token=abc"));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("SameSite=Lax"));
        assert!(text.contains("Path=/"));
        assert!(text.contains("Max-Age=3600"));
        assert!(!text.contains("Secure"));
    }

    #[test]
    fn test_status_cookie_is_script_readable() {
        let cookie = session_cookie(
            AUTH_STATUS_COOKIE,
            AUTH_STATUS_VALUE.to_string(),
            3600,
            false,
            true,
        );
        let text = cookie.to_string();
        assert!(text.starts_with("auth-status=authenticated"));
        assert!(!text.contains("HttpOnly"));
        assert!(text.contains("Secure"));
    }

    #[test]
    fn test_otp_text_accepts_string_or_number() {
        assert_eq!(
            otp_text(Some(&serde_json::json!(" 123456 "))).as_deref(),
            Some("123456")
        );
        assert_eq!(
            otp_text(Some(&serde_json::json!(123456))).as_deref(),
            Some("123456")
        );
        assert_eq!(otp_text(Some(&serde_json::json!(""))), None);
        assert_eq!(otp_text(Some(&serde_json::json!(null))), None);
        assert_eq!(otp_text(None), None);
    }

    #[test]
    fn test_otp_hidden_when_not_exposed() {
        let now = chrono::Utc::now();
        let challenge = OtpChallenge {
            user: crate::storage::UserRow {
                id: Uuid::nil(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role: "USER".to_string(),
                is_verified: false,
                token_hash: None,
                created_at: now,
                updated_at: now,
            },
            otp: "123456".to_string(),
        };
        let json =
            serde_json::to_value(OtpIssuedResponse::new("Login successful", challenge, false))
                .unwrap();
        assert!(json["responseData"].get("otp").is_none());
        assert_eq!(json["responseData"]["userid"], Uuid::nil().to_string());
        assert_eq!(json["responseData"]["role"], "USER");
    }
}
