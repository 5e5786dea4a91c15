// Template marketplace domain
//
// This crate provides the DB-agnostic, HTTP-agnostic part of the
// marketplace: entity types, OTP codes, tag reconciliation planning,
// page access decisions, and pagination.
//
// Key design decisions:
// - Entity types serialize in camelCase, matching the admin console wire format
// - Decisions with security impact (OTP checks, page access) are pure functions
// - Errors are a single DomainError enum mapped to HTTP status by the server

pub mod access;
pub mod error;
pub mod order;
pub mod otp;
pub mod pagination;
pub mod tag;
pub mod tag_sync;
pub mod template;
pub mod user;

// Re-exports for convenience
pub use access::{AccessDecision, RouteClass, TokenState};
pub use error::{DomainError, Result, ValidationIssue};
pub use order::{Order, OrderStatus};
pub use pagination::{PageRequest, Pagination};
pub use tag::Tag;
pub use tag_sync::TagReconciliation;
pub use template::{TagSummary, Template, TemplateDetails, TemplateFilter, TemplateSummary};
pub use user::{Role, User, UserProfile};
