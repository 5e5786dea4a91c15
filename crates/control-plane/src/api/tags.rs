// Tag HTTP routes
// Decision: Single /api/tag resource; the id travels in the query (GET) or body (PUT, DELETE)

use std::sync::Arc;

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use marketplace_core::{DomainError, Tag};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{flag, parse_id, ErrorResponse};
use super::error::{ApiError, ApiResult};
use crate::auth::{AdminUser, AuthState};
use crate::services::TagService;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListTagsQuery {
    /// Return this single tag
    pub id: Option<String>,
    /// Embed template summaries instead of a template count
    pub include_templates: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    #[schema(example = "nextjs")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTagRequest {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteTagRequest {
    pub id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagResponse {
    pub success: bool,
    pub tag: Tag,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagListResponse {
    pub success: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedTagResponse {
    pub success: bool,
    pub updated_tag: Tag,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTagResponse {
    pub success: bool,
    pub deleted_tag: Tag,
}

/// App state for tag routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TagService>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Create tag routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/tag",
            get(list_tags)
                .post(create_tag)
                .put(update_tag)
                .delete(delete_tag),
        )
        .with_state(state)
}

fn required_id(id: Option<&str>) -> ApiResult<uuid::Uuid> {
    let id = id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::from(DomainError::invalid("id", "id is required")))?;
    Ok(parse_id(id, "Tag")?)
}

/// GET /api/tag - List tags newest first, or fetch one with `?id=`
#[utoipa::path(
    get,
    path = "/api/tag",
    params(ListTagsQuery),
    responses(
        (status = 200, description = "Tags", body = TagListResponse),
        (status = 404, description = "Tag not found (with ?id=)", body = ErrorResponse)
    ),
    tag = "tags"
)]
pub async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<ListTagsQuery>,
) -> ApiResult<Response> {
    let include_templates = flag(query.include_templates.as_deref());

    if let Some(id) = query.id.as_deref().filter(|id| !id.trim().is_empty()) {
        let id = parse_id(id, "Tag")?;
        let tag = state
            .service
            .get(id, include_templates)
            .await?
            .ok_or_else(|| DomainError::not_found("Tag"))?;
        return Ok(Json(TagResponse { success: true, tag }).into_response());
    }

    let tags = state.service.list(include_templates).await?;
    Ok(Json(TagListResponse {
        success: true,
        tags,
    })
    .into_response())
}

/// POST /api/tag - Create a tag
#[utoipa::path(
    post,
    path = "/api/tag",
    request_body = CreateTagRequest,
    responses(
        (status = 200, description = "Tag created", body = TagResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Tag already exists", body = ErrorResponse)
    ),
    tag = "tags"
)]
pub async fn create_tag(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateTagRequest>,
) -> ApiResult<Json<TagResponse>> {
    let tag = state.service.create(req.name.as_deref()).await?;
    Ok(Json(TagResponse { success: true, tag }))
}

/// PUT /api/tag - Rename a tag
#[utoipa::path(
    put,
    path = "/api/tag",
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag renamed", body = UpdatedTagResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse),
        (status = 409, description = "Name used by another tag", body = ErrorResponse)
    ),
    tag = "tags"
)]
pub async fn update_tag(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<UpdateTagRequest>,
) -> ApiResult<Json<UpdatedTagResponse>> {
    let id = required_id(req.id.as_deref())?;
    let updated_tag = state.service.update(id, req.name.as_deref()).await?;
    Ok(Json(UpdatedTagResponse {
        success: true,
        updated_tag,
    }))
}

/// DELETE /api/tag - Delete a tag and its associations
#[utoipa::path(
    delete,
    path = "/api/tag",
    request_body = DeleteTagRequest,
    responses(
        (status = 200, description = "Tag deleted", body = DeletedTagResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    tag = "tags"
)]
pub async fn delete_tag(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<DeleteTagRequest>,
) -> ApiResult<Json<DeletedTagResponse>> {
    let id = required_id(req.id.as_deref())?;
    let deleted_tag = state.service.delete(id).await?;
    Ok(Json(DeletedTagResponse {
        success: true,
        deleted_tag,
    }))
}
