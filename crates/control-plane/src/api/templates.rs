// Template catalogue HTTP routes
// Decision: Reads are public; writes require an admin session

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use marketplace_core::{DomainError, PageRequest, Pagination, Template, TemplateDetails, TemplateFilter};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{flag, parse_id, ErrorResponse, MessageResponse};
use super::error::ApiResult;
use crate::auth::{AdminUser, AuthState};
use crate::services::TemplateService;

/// Request to create a template
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    #[schema(example = "Admin Dashboard")]
    pub title: Option<String>,
    pub description: Option<String>,
    /// Absolute URL of the cover image
    #[schema(example = "https://cdn.example.com/2025-01-01/cover.png")]
    pub cover_image: Option<String>,
    /// Markdown body
    pub content: Option<String>,
    #[schema(example = 49.0)]
    pub price: Option<f64>,
    pub offer_price: Option<f64>,
    /// Absolute URL of the downloadable resource
    pub resource: Option<String>,
    pub details: Option<TemplateDetails>,
    /// Ids of existing tags to associate
    pub tag_ids: Option<Vec<String>>,
}

/// Request to update a template. Only provided fields are changed;
/// `tagIds`, when present, becomes the complete tag set.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub content: Option<String>,
    pub price: Option<f64>,
    pub offer_price: Option<f64>,
    pub resource: Option<String>,
    pub details: Option<TemplateDetails>,
    pub tag_ids: Option<Vec<String>>,
}

/// Query parameters for listing templates
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListTemplatesQuery {
    /// Return this single template instead of a page
    pub id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
    /// Case-insensitive tag name
    pub tag_filter: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Embed tags instead of a tag count
    pub include_tags: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TemplateQuery {
    pub include_tags: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateResponse {
    pub success: bool,
    pub template: Template,
}

impl TemplateResponse {
    fn new(template: Template) -> Json<Self> {
        Json(Self {
            success: true,
            template,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<Template>,
    pub pagination: Pagination,
}

/// App state for template routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TemplateService>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Create template routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/templates", get(list_templates).post(create_template))
        .route(
            "/api/templates/:id",
            get(get_template)
                .put(update_template)
                .delete(delete_template),
        )
        .with_state(state)
}

/// GET /api/templates - List templates, or fetch one with `?id=`
#[utoipa::path(
    get,
    path = "/api/templates",
    params(ListTemplatesQuery),
    responses(
        (status = 200, description = "Page of templates", body = TemplateListResponse),
        (status = 404, description = "Template not found (with ?id=)", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "templates"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
) -> ApiResult<Response> {
    let include_tags = flag(query.include_tags.as_deref());

    if let Some(id) = query.id.as_deref().filter(|id| !id.trim().is_empty()) {
        let id = parse_id(id, "Template")?;
        let template = state
            .service
            .get(id, include_tags)
            .await?
            .ok_or_else(|| DomainError::not_found("Template"))?;
        return Ok(TemplateResponse::new(template).into_response());
    }

    let filter = TemplateFilter {
        search: query.search,
        tag_name: query.tag_filter,
        min_price: query.min_price,
        max_price: query.max_price,
    };
    let page = PageRequest::new(query.page, query.limit);
    let (templates, pagination) = state.service.list(&filter, page, include_tags).await?;

    Ok(Json(TemplateListResponse {
        success: true,
        templates,
        pagination,
    })
    .into_response())
}

/// POST /api/templates - Create a template
#[utoipa::path(
    post,
    path = "/api/templates",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = TemplateResponse),
        (status = 400, description = "Invalid body or unknown tag ids", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    ),
    tag = "templates"
)]
pub async fn create_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateTemplateRequest>,
) -> ApiResult<(StatusCode, Json<TemplateResponse>)> {
    let template = state.service.create(req).await?;
    Ok((StatusCode::CREATED, TemplateResponse::new(template)))
}

/// GET /api/templates/{id} - Get a template
#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    params(
        ("id" = String, Path, description = "Template ID"),
        TemplateQuery
    ),
    responses(
        (status = 200, description = "Template found", body = TemplateResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    ),
    tag = "templates"
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TemplateQuery>,
) -> ApiResult<Json<TemplateResponse>> {
    let id = parse_id(&id, "Template")?;
    let template = state
        .service
        .get(id, flag(query.include_tags.as_deref()))
        .await?
        .ok_or_else(|| DomainError::not_found("Template"))?;
    Ok(TemplateResponse::new(template))
}

/// PUT /api/templates/{id} - Update a template and reconcile its tags
#[utoipa::path(
    put,
    path = "/api/templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = TemplateResponse),
        (status = 400, description = "Invalid body or unknown tag ids", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    ),
    tag = "templates"
)]
pub async fn update_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTemplateRequest>,
) -> ApiResult<Json<TemplateResponse>> {
    let id = parse_id(&id, "Template")?;
    let template = state
        .service
        .update(id, req)
        .await?
        .ok_or_else(|| DomainError::not_found("Template"))?;
    Ok(TemplateResponse::new(template))
}

/// DELETE /api/templates/{id} - Delete a template
#[utoipa::path(
    delete,
    path = "/api/templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    ),
    tag = "templates"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id, "Template")?;
    if !state.service.delete(id).await? {
        return Err(DomainError::not_found("Template").into());
    }
    Ok(Json(MessageResponse::new("Template deleted successfully")))
}
