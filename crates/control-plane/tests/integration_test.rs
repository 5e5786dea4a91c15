// Integration tests for the marketplace API
// Run with: cargo test -p marketplace-control-plane --test integration_test
// Runs in-process against the in-memory store, a recording mailer and an in-memory object store.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use marketplace_control_plane::{
    auth::{config::JwtConfig, AuthConfig},
    build_app,
    mail::{EmailMessage, Mailer},
    object_store::InMemoryObjectStore,
    storage::{StorageBackend, UpdateUserRow},
    AppContext,
};
use marketplace_core::Role;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        self.sent.lock().push(message);
        Ok(())
    }
}

struct TestApp {
    router: Router,
    db: StorageBackend,
    mailer: Arc<RecordingMailer>,
    store: Arc<InMemoryObjectStore>,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

fn test_app() -> TestApp {
    let db = StorageBackend::in_memory();
    let mailer = Arc::new(RecordingMailer::default());
    let store = Arc::new(InMemoryObjectStore::default());
    let auth_config = AuthConfig {
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let ctx = AppContext {
        db: db.clone(),
        auth_config,
        mailer: mailer.clone(),
        object_store: store.clone(),
    };
    TestApp {
        router: build_app(ctx, None),
        db,
        mailer,
        store,
    }
}

fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn page_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn multipart_request(
    uri: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
    token: Option<&str>,
) -> Request<Body> {
    let boundary = "marketplace-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> TestResponse {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Sign up, verify the emailed OTP, and return the user id and session token.
async fn sign_in(app: &TestApp, name: &str, email: &str) -> (Uuid, String) {
    let signup = send(
        app,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({"name": name, "email": email}),
            None,
        ),
    )
    .await;
    assert_eq!(signup.status, StatusCode::OK, "signup failed: {}", signup.body);
    verify_issued(app, &signup.body).await
}

async fn verify_issued(app: &TestApp, issued: &Value) -> (Uuid, String) {
    let user_id = issued["responseData"]["userid"].as_str().unwrap().to_string();
    let otp = issued["responseData"]["otp"].as_str().unwrap().to_string();
    let verified = send(
        app,
        json_request(
            Method::POST,
            "/api/auth/otp",
            json!({"otp": otp, "userId": user_id}),
            None,
        ),
    )
    .await;
    assert_eq!(verified.status, StatusCode::OK, "verify failed: {}", verified.body);
    let token = verified.body["token"].as_str().unwrap().to_string();
    (Uuid::parse_str(&user_id).unwrap(), token)
}

async fn login(app: &TestApp, email: &str) -> (Uuid, String) {
    let issued = send(
        app,
        json_request(Method::POST, "/api/auth/login", json!({"email": email}), None),
    )
    .await;
    assert_eq!(issued.status, StatusCode::OK, "login failed: {}", issued.body);
    verify_issued(app, &issued.body).await
}

/// Sign in, promote to admin, and sign in again so the token carries the role.
async fn admin_token(app: &TestApp) -> String {
    let (user_id, _) = sign_in(app, "Admin", "admin@example.com").await;
    app.db
        .update_user(
            user_id,
            UpdateUserRow {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    login(app, "admin@example.com").await.1
}

async fn create_tag(app: &TestApp, token: &str, name: &str) -> String {
    let response = send(
        app,
        json_request(Method::POST, "/api/tag", json!({"name": name}), Some(token)),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    response.body["tag"]["id"].as_str().unwrap().to_string()
}

fn template_body(title: &str, tag_ids: &[&str]) -> Value {
    json!({
        "title": title,
        "description": "A landing page template",
        "content": "# Landing",
        "coverImage": "https://cdn.example.com/cover.png",
        "price": 49.0,
        "offerPrice": 29.0,
        "details": {"version": "1.0.0", "builtWith": ["Next.js"]},
        "tagIds": tag_ids,
    })
}

fn tag_names(template: &Value) -> Vec<String> {
    let mut names: Vec<String> = template["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

// ============================================
// Authentication
// ============================================

#[tokio::test]
async fn test_signup_sends_otp_and_rejects_duplicates() {
    let app = test_app();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({"name": "Ada Lovelace", "email": "Ada@Example.com"}),
            None,
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["message"], "OTP sent to email");
    assert_eq!(response.body["responseData"]["email"], "ada@example.com");
    assert_eq!(response.body["responseData"]["role"], "USER");

    let otp = response.body["responseData"]["otp"].as_str().unwrap();
    assert_eq!(otp.len(), 6);
    {
        let sent = app.mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "ada@example.com");
        assert!(sent[0].text.contains(otp));
    }

    let duplicate = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({"name": "Ada Again", "email": "ada@example.com"}),
            None,
        ),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["success"], false);
    assert_eq!(duplicate.body["error"], "User already exists");
}

#[tokio::test]
async fn test_signup_reports_every_invalid_field() {
    let app = test_app();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({"name": "A", "email": "not-an-email"}),
            None,
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Invalid request");
    assert_eq!(response.body["errors"].as_array().unwrap().len(), 2);
    assert!(app.mailer.sent.lock().is_empty());
}

#[tokio::test]
async fn test_login_unknown_user_returns_404() {
    let app = test_app();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            json!({"email": "ghost@example.com"}),
            None,
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_otp_verification_sets_cookies_and_is_single_use() {
    let app = test_app();
    let signup = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({"name": "Grace", "email": "grace@example.com"}),
            None,
        ),
    )
    .await;
    let user_id = signup.body["responseData"]["userid"].as_str().unwrap();
    let otp = signup.body["responseData"]["otp"].as_str().unwrap();

    let verified = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/otp",
            json!({"otp": otp, "userId": user_id}),
            None,
        ),
    )
    .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["responseData"], "OTP verified successfully");

    let cookies = verified.set_cookies();
    let token_cookie = cookies.iter().find(|c| c.starts_with("token=")).unwrap();
    assert!(token_cookie.contains("HttpOnly"));
    assert!(token_cookie.contains("Max-Age=3600"));
    let status_cookie = cookies
        .iter()
        .find(|c| c.starts_with("auth-status="))
        .unwrap();
    assert!(status_cookie.starts_with("auth-status=authenticated"));
    assert!(!status_cookie.contains("HttpOnly"));

    let replay = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/otp",
            json!({"otp": otp, "userId": user_id}),
            None,
        ),
    )
    .await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(replay.body["error"], "Invalid OTP");
}

#[tokio::test]
async fn test_wrong_and_expired_otp_are_rejected() {
    let app = test_app();
    let signup = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({"name": "Linus", "email": "linus@example.com"}),
            None,
        ),
    )
    .await;
    let user_id = signup.body["responseData"]["userid"].as_str().unwrap();
    let otp = signup.body["responseData"]["otp"].as_str().unwrap();
    let wrong = if otp == "000000" { "111111" } else { "000000" };

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/otp",
            json!({"otp": wrong, "userId": user_id}),
            None,
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Invalid OTP");

    app.db
        .upsert_otp(
            Uuid::parse_str(user_id).unwrap(),
            "123456",
            Utc::now() - Duration::minutes(1),
        )
        .await
        .unwrap();

    let expired = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/otp",
            json!({"otp": 123456, "userId": user_id}),
            None,
        ),
    )
    .await;
    assert_eq!(expired.status, StatusCode::BAD_REQUEST);
    assert_eq!(expired.body["error"], "OTP expired");
}

#[tokio::test]
async fn test_logout_expires_both_cookies() {
    let app = test_app();

    let response = send(
        &app,
        json_request(Method::POST, "/api/auth/logout", json!({}), None),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Logged out successfully");
    let cookies = response.set_cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_session_endpoints_accept_bearer_and_cookie() {
    let app = test_app();
    let (user_id, token) = sign_in(&app, "Margaret", "margaret@example.com").await;

    let me = send(&app, get_request("/api/auth/me", Some(&token))).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["id"], user_id.to_string());
    assert_eq!(me.body["user"]["email"], "margaret@example.com");

    let verified = send(
        &app,
        page_request("/api/auth/isverify", Some(&format!("token={token}"))),
    )
    .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["isVerified"], true);

    let anonymous = send(&app, get_request("/api/auth/me", None)).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"], "Authentication required");

    let exists = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/isexist",
            json!({"email": "MARGARET@example.com"}),
            None,
        ),
    )
    .await;
    assert_eq!(exists.body["exists"], true);
}

#[tokio::test]
async fn test_previous_token_is_revoked_by_new_login() {
    let app = test_app();
    let (_, first) = sign_in(&app, "Barbara", "barbara@example.com").await;
    let (_, second) = login(&app, "barbara@example.com").await;

    let stale = send(&app, get_request("/api/auth/me", Some(&first))).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);

    let current = send(&app, get_request("/api/auth/me", Some(&second))).await;
    assert_eq!(current.status, StatusCode::OK);
}

// ============================================
// Catalogue
// ============================================

#[tokio::test]
async fn test_template_writes_require_admin() {
    let app = test_app();
    let (_, user_token) = sign_in(&app, "Regular", "user@example.com").await;

    let anonymous = send(
        &app,
        json_request(Method::POST, "/api/templates", template_body("Landing", &[]), None),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = send(
        &app,
        json_request(
            Method::POST,
            "/api/templates",
            template_body("Landing", &[]),
            Some(&user_token),
        ),
    )
    .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["error"], "Admin access required");

    let admin = admin_token(&app).await;
    let created = send(
        &app,
        json_request(
            Method::POST,
            "/api/templates",
            template_body("Landing", &[]),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["template"]["title"], "Landing");
    assert_eq!(created.body["template"]["details"]["builtWith"], json!(["Next.js"]));
}

#[tokio::test]
async fn test_template_tags_are_reconciled_on_update() {
    let app = test_app();
    let admin = admin_token(&app).await;
    let react = create_tag(&app, &admin, "react").await;
    let saas = create_tag(&app, &admin, "saas").await;
    let blog = create_tag(&app, &admin, "blog").await;

    let created = send(
        &app,
        json_request(
            Method::POST,
            "/api/templates",
            template_body("Dashboard", &[&react, &saas]),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(tag_names(&created.body["template"]), vec!["react", "saas"]);
    let id = created.body["template"]["id"].as_str().unwrap().to_string();

    let replaced = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/templates/{id}"),
            json!({"tagIds": [saas, blog, blog]}),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(tag_names(&replaced.body["template"]), vec!["blog", "saas"]);

    let untouched = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/templates/{id}"),
            json!({"price": 59.0}),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(untouched.status, StatusCode::OK);
    assert_eq!(untouched.body["template"]["price"], 59.0);
    assert_eq!(tag_names(&untouched.body["template"]), vec!["blog", "saas"]);

    let filtered = send(
        &app,
        get_request("/api/templates?tagFilter=BLOG&includeTags=true", None),
    )
    .await;
    assert_eq!(filtered.status, StatusCode::OK);
    assert_eq!(filtered.body["templates"].as_array().unwrap().len(), 1);
    assert_eq!(filtered.body["pagination"]["totalCount"], 1);

    let excluded = send(&app, get_request("/api/templates?tagFilter=react", None)).await;
    assert!(excluded.body["templates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_tag_ids_persist_nothing() {
    let app = test_app();
    let admin = admin_token(&app).await;

    let garbage = send(
        &app,
        json_request(
            Method::POST,
            "/api/templates",
            template_body("Broken", &["not-a-uuid"]),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);
    assert!(garbage.body["error"]
        .as_str()
        .unwrap()
        .contains("not-a-uuid"));

    let missing = Uuid::now_v7().to_string();
    let unknown = send(
        &app,
        json_request(
            Method::POST,
            "/api/templates",
            template_body("Broken", &[&missing]),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let listed = send(&app, get_request("/api/templates", None)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert!(listed.body["templates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_template_lookup_and_delete() {
    let app = test_app();
    let admin = admin_token(&app).await;
    let created = send(
        &app,
        json_request(
            Method::POST,
            "/api/templates",
            template_body("Portfolio", &[]),
            Some(&admin),
        ),
    )
    .await;
    let id = created.body["template"]["id"].as_str().unwrap().to_string();

    let by_query = send(&app, get_request(&format!("/api/templates?id={id}"), None)).await;
    assert_eq!(by_query.status, StatusCode::OK);
    assert_eq!(by_query.body["template"]["title"], "Portfolio");

    let bad_id = send(&app, get_request("/api/templates/not-a-uuid", None)).await;
    assert_eq!(bad_id.status, StatusCode::NOT_FOUND);

    let deleted = send(
        &app,
        json_request(Method::DELETE, &format!("/api/templates/{id}"), json!({}), Some(&admin)),
    )
    .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Template deleted successfully");

    let gone = send(&app, get_request(&format!("/api/templates/{id}"), None)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tag_lifecycle() {
    let app = test_app();
    let admin = admin_token(&app).await;
    let id = create_tag(&app, &admin, "landing").await;

    let duplicate = send(
        &app,
        json_request(Method::POST, "/api/tag", json!({"name": "landing"}), Some(&admin)),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let renamed = send(
        &app,
        json_request(
            Method::PUT,
            "/api/tag",
            json!({"id": id, "name": "landing-page"}),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["updatedTag"]["name"], "landing-page");

    let listed = send(&app, get_request("/api/tag", None)).await;
    assert_eq!(listed.body["tags"].as_array().unwrap().len(), 1);
    assert_eq!(listed.body["tags"][0]["templateCount"], 0);

    let deleted = send(
        &app,
        json_request(Method::DELETE, "/api/tag", json!({"id": id}), Some(&admin)),
    )
    .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["deletedTag"]["name"], "landing-page");

    let again = send(
        &app,
        json_request(Method::DELETE, "/api/tag", json!({"id": id}), Some(&admin)),
    )
    .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_admin_routes() {
    let app = test_app();
    let (_, user_token) = sign_in(&app, "Regular", "regular@example.com").await;

    let forbidden = send(&app, get_request("/api/users", Some(&user_token))).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let admin = admin_token(&app).await;
    let created = send(
        &app,
        json_request(
            Method::POST,
            "/api/users",
            json!({"email": "New.Person@Example.com"}),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["user"]["email"], "new.person@example.com");
    assert_eq!(created.body["user"]["name"], "new.person");

    let listed = send(&app, get_request("/api/users", Some(&admin))).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["users"].as_array().unwrap().len(), 3);
}

// ============================================
// Page gate
// ============================================

#[tokio::test]
async fn test_page_gate_redirects() {
    let app = test_app();

    let anonymous = send(&app, page_request("/dashboard", None)).await;
    assert_eq!(anonymous.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(anonymous.location(), Some("/login"));

    let forged = send(&app, page_request("/dashboard", Some("token=forged"))).await;
    assert_eq!(forged.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(forged.location(), Some("/login"));
    assert!(forged
        .set_cookies()
        .iter()
        .any(|c| c.starts_with("token=") && c.contains("Max-Age=0")));

    let login_page = send(&app, page_request("/login", None)).await;
    assert_eq!(login_page.status, StatusCode::NOT_FOUND);

    let (_, user_token) = sign_in(&app, "Regular", "regular@example.com").await;
    let cookie = format!("token={user_token}");
    let user_admin = send(&app, page_request("/admin/templates", Some(&cookie))).await;
    assert_eq!(user_admin.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(user_admin.location(), Some("/"));

    let user_page = send(&app, page_request("/dashboard", Some(&cookie))).await;
    assert_eq!(user_page.status, StatusCode::NOT_FOUND);

    let admin = admin_token(&app).await;
    let admin_page = send(
        &app,
        page_request("/admin/templates", Some(&format!("token={admin}"))),
    )
    .await;
    assert_eq!(admin_page.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_gate_uses_signed_role_while_api_uses_stored_role() {
    let app = test_app();
    let admin = admin_token(&app).await;
    let me = send(&app, get_request("/api/auth/me", Some(&admin))).await;
    let admin_id = Uuid::parse_str(me.body["user"]["id"].as_str().unwrap()).unwrap();

    app.db
        .update_user(
            admin_id,
            UpdateUserRow {
                role: Some(Role::User),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Signed claim still says admin: the gate lets the page through
    let page = send(
        &app,
        page_request("/admin/templates", Some(&format!("token={admin}"))),
    )
    .await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    let api = send(&app, get_request("/api/users", Some(&admin))).await;
    assert_eq!(api.status, StatusCode::FORBIDDEN);

    // A newer login supersedes the token for the API but not for the gate
    login(&app, "admin@example.com").await;
    let page = send(
        &app,
        page_request("/admin/templates", Some(&format!("token={admin}"))),
    )
    .await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    let me = send(&app, get_request("/api/auth/me", Some(&admin))).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

// ============================================
// Uploads, checkout, health
// ============================================

#[tokio::test]
async fn test_image_upload_is_relayed_to_object_store() {
    let app = test_app();
    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    let response = send(
        &app,
        multipart_request("/api/uploads", "Cover.PNG", "image/png", &png, None),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let key = response.body["key"].as_str().unwrap();
    assert!(key.ends_with(".png"));
    assert!(response.body["url"].as_str().unwrap().ends_with(key));

    let stored = app.store.get(key).unwrap();
    assert_eq!(stored.bytes, png.to_vec());
    assert_eq!(stored.content_type, "image/png");

    let rejected = send(
        &app,
        multipart_request("/api/uploads", "notes.txt", "text/plain", b"hello", None),
    )
    .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_resource_upload_requires_admin() {
    let app = test_app();

    let anonymous = send(
        &app,
        multipart_request(
            "/api/templates/upload",
            "bundle.zip",
            "application/zip",
            b"PK",
            None,
        ),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let admin = admin_token(&app).await;
    let stored = send(
        &app,
        multipart_request(
            "/api/templates/upload",
            "bundle.zip",
            "application/zip",
            b"PK",
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(stored.status, StatusCode::CREATED);
    let key = stored.body["key"].as_str().unwrap();
    assert!(key.starts_with("resources/"));
    assert!(key.ends_with(".zip"));
}

#[tokio::test]
async fn test_checkout_creates_pending_order() {
    let app = test_app();
    let admin = admin_token(&app).await;
    let created = send(
        &app,
        json_request(
            Method::POST,
            "/api/templates",
            template_body("Shop", &[]),
            Some(&admin),
        ),
    )
    .await;
    let template_id = created.body["template"]["id"].as_str().unwrap().to_string();

    let order = send(
        &app,
        json_request(
            Method::POST,
            "/api/checkout",
            json!({
                "name": "Buyer",
                "email": "buyer@example.com",
                "templateId": template_id,
                "amount": 29.0
            }),
            None,
        ),
    )
    .await;
    assert_eq!(order.status, StatusCode::OK);
    assert_eq!(order.body["order"]["status"], "PENDING");
    assert_eq!(order.body["order"]["templateId"], template_id);

    let missing = send(
        &app,
        json_request(
            Method::POST,
            "/api/checkout",
            json!({
                "name": "Buyer",
                "email": "buyer@example.com",
                "templateId": Uuid::now_v7().to_string(),
                "amount": 29.0
            }),
            None,
        ),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = test_app();

    let response = send(&app, get_request("/health", None)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["storage"], "memory");
}
