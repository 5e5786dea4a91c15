// Server configuration loaded from environment variables
//
// Auth, mail and object storage settings live with their modules
// (`auth::config`, `mail::http`, `object_store`); this covers the
// process-level settings.

use std::path::PathBuf;

use axum::http::HeaderValue;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Listen address (`BIND_ADDR`)
    pub bind_addr: String,
    /// PostgreSQL URL; without it the in-memory store is used
    pub database_url: Option<String>,
    /// Origins allowed for credentialed cross-origin requests
    pub cors_origins: Vec<HeaderValue>,
    /// Built admin console to serve behind the page gate
    pub ui_dist_dir: Option<PathBuf>,
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated origin list, dropping entries that are not valid header values.
pub fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: non_empty("DATABASE_URL"),
            cors_origins: non_empty("CORS_ALLOWED_ORIGINS")
                .map(|s| parse_origins(&s))
                .unwrap_or_default(),
            ui_dist_dir: non_empty("UI_DIST_DIR").map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins("https://admin.example.com, ,https://shop.example.com");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://admin.example.com");
        assert_eq!(origins[1], "https://shop.example.com");
    }

    #[test]
    fn test_parse_origins_empty() {
        assert!(parse_origins("").is_empty());
    }
}
