// Template marketplace API server
// Decision: Without DATABASE_URL the server runs on the in-memory store (dev mode)
// Decision: Mail and object storage fall back to log-only and in-memory transports when unconfigured

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use marketplace_control_plane::{
    auth::AuthConfig,
    build_app,
    config::ServerConfig,
    mail::{HttpMailer, LogMailer, MailConfig, Mailer},
    object_store::{InMemoryObjectStore, ObjectStore, ObjectStoreConfig, S3ObjectStore},
    openapi::ApiDoc,
    storage::StorageBackend,
    AppContext,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
        ])
        .allow_credentials(true)
}

/// Add Swagger UI, CORS (when origins are configured) and request tracing.
fn with_outer_layers(app: Router, cors_origins: Vec<HeaderValue>) -> Router {
    let app =
        app.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let app = if cors_origins.is_empty() {
        app
    } else {
        app.layer(cors_layer(cors_origins))
    };

    app.layer(TraceLayer::new_for_http())
}

async fn storage_backend(database_url: Option<&str>) -> Result<StorageBackend> {
    match database_url {
        Some(url) => {
            let db = StorageBackend::postgres(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database, migrations applied");
            Ok(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is lost on restart)");
            Ok(StorageBackend::in_memory())
        }
    }
}

fn mailer() -> Result<Arc<dyn Mailer>> {
    match MailConfig::from_env() {
        Some(config) => {
            tracing::info!(api_url = %config.api_url, sender = %config.sender_email, "Email delivery configured");
            Ok(Arc::new(HttpMailer::new(config)?))
        }
        None => {
            tracing::warn!("MAIL_API_KEY or MAIL_SENDER_EMAIL not set, OTP emails are logged only");
            Ok(Arc::new(LogMailer))
        }
    }
}

fn object_store() -> Result<Arc<dyn ObjectStore>> {
    let config = ObjectStoreConfig::from_env();
    match config.endpoint.clone() {
        Some(endpoint) => {
            tracing::info!(
                %endpoint,
                region = ?config.region,
                bucket = ?config.bucket,
                "Object storage configured"
            );
            Ok(Arc::new(S3ObjectStore::new(endpoint, config)?))
        }
        None => {
            tracing::warn!("STORAGE_ENDPOINT not set, uploads are kept in memory");
            Ok(Arc::new(InMemoryObjectStore::default()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketplace_control_plane=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("marketplace-control-plane starting...");

    let server_config = ServerConfig::from_env();
    let db = storage_backend(server_config.database_url.as_deref()).await?;

    let auth_config = AuthConfig::from_env();
    tracing::info!(
        token_lifetime_secs = auth_config.token_lifetime_secs(),
        otp_ttl_secs = auth_config.otp_ttl.as_secs(),
        cookie_secure = auth_config.cookie_secure,
        expose_otp = auth_config.expose_otp,
        "Authentication configured"
    );
    if auth_config.expose_otp {
        tracing::warn!("AUTH_EXPOSE_OTP is enabled, OTP codes are returned in API responses");
    }

    let ctx = AppContext {
        db,
        auth_config,
        mailer: mailer()?,
        object_store: object_store()?,
    };

    match &server_config.ui_dist_dir {
        Some(dir) => tracing::info!(dir = %dir.display(), "Serving admin console"),
        None => tracing::info!("UI_DIST_DIR not set, page routes return 404"),
    }

    if server_config.cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?server_config.cors_origins, "CORS origins configured");
    }

    let app = build_app(ctx, server_config.ui_dist_dir.as_deref());
    let app = with_outer_layers(app, server_config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", server_config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
