// HTTP API routes
//
// This module contains all HTTP route handlers for the public API.
// Each submodule handles a specific resource type with its own AppState.

pub mod checkout;
pub mod common;
pub mod error;
pub mod health;
pub mod tags;
pub mod templates;
pub mod uploads;
pub mod users;
pub mod validation;

// Re-export common types
pub use common::{ErrorResponse, MessageResponse};
pub use error::{ApiError, ApiResult};
