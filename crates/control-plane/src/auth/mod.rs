// Authentication: OTP login, session tokens, API extractors and the page gate

pub mod config;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod routes;

pub use config::AuthConfig;
pub use middleware::{AdminUser, AuthError, AuthState, AuthUser};

/// Http-only cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

/// Script-readable marker cookie for the console
pub const AUTH_STATUS_COOKIE: &str = "auth-status";
pub const AUTH_STATUS_VALUE: &str = "authenticated";
