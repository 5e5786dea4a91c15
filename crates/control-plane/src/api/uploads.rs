// Upload relay HTTP routes
// Decision: Files are buffered in memory then PUT to object storage
// Decision: Body limits sit above the per-kind maximum so oversize files get a 400 with a reason

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use marketplace_core::DomainError;
use serde::Serialize;
use utoipa::ToSchema;

use super::common::ErrorResponse;
use super::error::{ApiError, ApiResult};
use crate::auth::{AdminUser, AuthState};
use crate::services::{UploadKind, UploadService};

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    /// Public URL of the stored object
    pub url: String,
    /// Object key within the bucket
    pub key: String,
}

/// App state for upload routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<UploadService>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Create upload routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/uploads",
            post(upload_image).layer(DefaultBodyLimit::max(UploadKind::Image.max_bytes() * 2)),
        )
        .route(
            "/api/templates/upload",
            post(upload_resource)
                .layer(DefaultBodyLimit::max(UploadKind::Resource.max_bytes() + 1024 * 1024)),
        )
        .with_state(state)
}

fn multipart_error(err: MultipartError) -> ApiError {
    tracing::debug!("Failed to read multipart body: {}", err);
    ApiError::new(err.status(), err.body_text())
}

struct FileField {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_file(mut multipart: Multipart) -> ApiResult<FileField> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(FileField {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(DomainError::invalid(FILE_FIELD, "No file provided").into())
}

async fn relay(
    service: &UploadService,
    kind: UploadKind,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let file = read_file(multipart).await?;
    let stored = service
        .upload(
            kind,
            file.file_name.as_deref(),
            file.content_type.as_deref(),
            file.bytes,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            url: stored.url,
            key: stored.key,
        }),
    ))
}

/// POST /api/uploads - Upload an image (max 5 MB)
#[utoipa::path(
    post,
    path = "/api/uploads",
    request_body(content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing file, not an image, or too large", body = ErrorResponse),
        (status = 500, description = "Object storage failure", body = ErrorResponse)
    ),
    tag = "uploads"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    relay(&state.service, UploadKind::Image, multipart).await
}

/// POST /api/templates/upload - Upload a template resource (max 100 MB)
#[utoipa::path(
    post,
    path = "/api/templates/upload",
    request_body(content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    responses(
        (status = 201, description = "Resource stored", body = UploadResponse),
        (status = 400, description = "Missing file or too large", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 500, description = "Object storage failure", body = ErrorResponse)
    ),
    tag = "uploads"
)]
pub async fn upload_resource(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    relay(&state.service, UploadKind::Resource, multipart).await
}
