// Page access decisions
//
// Pure classification of request paths and the redirect decision for the
// page gate. The HTTP middleware only resolves the token state and turns
// the decision into a response.

use crate::user::Role;

/// Paths that never pass through the gate (JSON API, static assets, docs).
pub const UNGATED_PREFIXES: &[&str] = &[
    "/api",
    "/_next/static",
    "/_next/image",
    "/favicon.ico",
    "/assets",
    "/health",
    "/swagger-ui",
    "/api-doc",
];

/// Pages reachable without a session.
pub const PUBLIC_PREFIXES: &[&str] = &["/login", "/signup", "/otp"];

pub const ADMIN_PREFIX: &str = "/admin";

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Ungated,
    Public,
    Admin,
    Authenticated,
}

/// State of the session token presented with a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Missing,
    /// Present but the signature, expiry, or payload did not verify
    Invalid,
    Valid(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    RedirectToLogin { clear_token: bool },
    RedirectHome,
}

/// Segment-aware prefix match: `/admin` matches `/admin` and `/admin/x`, not `/administrator`.
fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn classify_path(path: &str) -> RouteClass {
    if UNGATED_PREFIXES.iter().any(|p| has_prefix(path, p)) {
        RouteClass::Ungated
    } else if PUBLIC_PREFIXES.iter().any(|p| has_prefix(path, p)) {
        RouteClass::Public
    } else if has_prefix(path, ADMIN_PREFIX) {
        RouteClass::Admin
    } else {
        RouteClass::Authenticated
    }
}

pub fn decide(path: &str, token: TokenState) -> AccessDecision {
    match classify_path(path) {
        RouteClass::Ungated | RouteClass::Public => AccessDecision::Allow,
        class => match token {
            TokenState::Missing => AccessDecision::RedirectToLogin { clear_token: false },
            TokenState::Invalid => AccessDecision::RedirectToLogin { clear_token: true },
            TokenState::Valid(role) => {
                if class == RouteClass::Admin && !role.is_admin() {
                    AccessDecision::RedirectHome
                } else {
                    AccessDecision::Allow
                }
            }
        },
    }
}
