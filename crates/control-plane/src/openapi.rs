// OpenAPI specification generation
//
// This module defines the OpenAPI spec for the marketplace API.
// It can be used by both the API server (for Swagger UI)
// and the export-openapi binary (for static document generation).

use crate::api;
use crate::auth;
use marketplace_core::{
    Order, OrderStatus, Pagination, Role, Tag, TagSummary, Template, TemplateDetails,
    TemplateSummary, User, UserProfile, ValidationIssue,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the marketplace API
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::routes::signup,
        auth::routes::login,
        auth::routes::verify_otp,
        auth::routes::logout,
        auth::routes::me,
        auth::routes::is_verify,
        auth::routes::is_exist,
        api::templates::list_templates,
        api::templates::create_template,
        api::templates::get_template,
        api::templates::update_template,
        api::templates::delete_template,
        api::tags::list_tags,
        api::tags::create_tag,
        api::tags::update_tag,
        api::tags::delete_tag,
        api::users::list_users,
        api::users::create_user,
        api::users::get_user,
        api::users::update_user,
        api::users::delete_user,
        api::uploads::upload_image,
        api::uploads::upload_resource,
        api::checkout::checkout,
        api::health::health,
    ),
    components(
        schemas(
            Role, User, UserProfile,
            Template, TemplateDetails, TemplateSummary, TagSummary, Tag,
            Order, OrderStatus, Pagination, ValidationIssue,
            api::ErrorResponse, api::MessageResponse,
            // Auth
            auth::routes::SignupRequest, auth::routes::EmailRequest,
            auth::routes::VerifyOtpRequest, auth::routes::OtpIssuedData,
            auth::routes::OtpIssuedResponse, auth::routes::VerifyOtpResponse,
            auth::routes::MeResponse, auth::routes::IsVerifiedResponse,
            auth::routes::ExistsResponse,
            // Catalogue
            api::templates::CreateTemplateRequest, api::templates::UpdateTemplateRequest,
            api::templates::TemplateResponse, api::templates::TemplateListResponse,
            api::tags::CreateTagRequest, api::tags::UpdateTagRequest, api::tags::DeleteTagRequest,
            api::tags::TagResponse, api::tags::TagListResponse,
            api::tags::UpdatedTagResponse, api::tags::DeletedTagResponse,
            // Users
            api::users::CreateUserRequest, api::users::UpdateUserRequest,
            api::users::UserResponse, api::users::UserListResponse,
            // Uploads and checkout
            api::uploads::UploadResponse,
            api::checkout::CheckoutRequest, api::checkout::OrderResponse,
            api::health::HealthResponse,
        )
    ),
    tags(
        (name = "auth", description = "Passwordless OTP authentication"),
        (name = "templates", description = "Template catalogue"),
        (name = "tags", description = "Catalogue tags"),
        (name = "users", description = "Account administration"),
        (name = "uploads", description = "File uploads relayed to object storage"),
        (name = "checkout", description = "Order creation"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Template Marketplace API",
        version = "0.1.0",
        description = "Admin API for a template marketplace: OTP sign-in, catalogue management and uploads",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
