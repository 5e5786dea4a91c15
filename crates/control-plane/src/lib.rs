// Template marketplace control-plane library
// Decision: Shared library for binaries (API server, OpenAPI export) and integration tests

use std::path::Path;
use std::sync::Arc;

use axum::{middleware, Json, Router};
use tower_http::services::{ServeDir, ServeFile};

// API routes and types (shared for OpenAPI generation)
pub mod api;

// Authentication module
pub mod auth;

// Process configuration
pub mod config;

// Outbound email
pub mod mail;

// Object storage for uploads
pub mod object_store;

// Services layer
pub mod services;

// Storage layer
pub mod storage;

// OpenAPI spec generation
pub mod openapi;

use api::ErrorResponse;
use auth::{AuthConfig, AuthState};
use mail::Mailer;
use object_store::ObjectStore;
use services::{CheckoutService, TagService, TemplateService, UploadService, UserService};
use storage::StorageBackend;

/// Everything the router needs, resolved by the caller.
#[derive(Clone)]
pub struct AppContext {
    pub db: StorageBackend,
    pub auth_config: AuthConfig,
    pub mailer: Arc<dyn Mailer>,
    pub object_store: Arc<dyn ObjectStore>,
}

async fn not_found() -> (axum::http::StatusCode, Json<ErrorResponse>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Not found")),
    )
}

/// Build the application router: JSON API, health, and the gated
/// admin console (or a JSON 404 when no console is configured).
pub fn build_app(ctx: AppContext, ui_dist_dir: Option<&Path>) -> Router {
    let auth_state = AuthState::new(ctx.auth_config, ctx.db.clone(), ctx.mailer);

    let templates_state = api::templates::AppState {
        service: Arc::new(TemplateService::new(ctx.db.clone())),
        auth: auth_state.clone(),
    };
    let tags_state = api::tags::AppState {
        service: Arc::new(TagService::new(ctx.db.clone())),
        auth: auth_state.clone(),
    };
    let users_state = api::users::UsersState {
        service: Arc::new(UserService::new(ctx.db.clone())),
        auth: auth_state.clone(),
    };
    let uploads_state = api::uploads::AppState {
        service: Arc::new(UploadService::new(ctx.object_store)),
        auth: auth_state.clone(),
    };
    let checkout_state = api::checkout::AppState {
        service: Arc::new(CheckoutService::new(ctx.db.clone())),
    };
    let health_state = api::health::HealthState { db: ctx.db };

    let jwt_service = auth_state.jwt_service.clone();

    let app = Router::new()
        .merge(api::health::routes(health_state))
        .merge(api::templates::routes(templates_state))
        .merge(api::tags::routes(tags_state))
        .merge(api::users::routes(users_state))
        .merge(api::uploads::routes(uploads_state))
        .merge(api::checkout::routes(checkout_state))
        .merge(auth::routes::routes(auth_state));

    let app = match ui_dist_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            app.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => app.fallback(not_found),
    };

    // The gate wraps the fallback too, so console pages are covered.
    app.layer(middleware::from_fn_with_state(
        jwt_service,
        auth::gate::page_gate,
    ))
}
