// Checkout HTTP route

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use marketplace_core::Order;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::ErrorResponse;
use super::error::ApiResult;
use crate::services::CheckoutService;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[schema(example = "Ada Lovelace")]
    pub name: Option<String>,
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    pub template_id: Option<String>,
    #[schema(example = 29.0)]
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

/// App state for checkout routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CheckoutService>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/checkout", post(checkout))
        .with_state(state)
}

/// POST /api/checkout - Record a pending order
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state.service.checkout(req).await?;
    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}
