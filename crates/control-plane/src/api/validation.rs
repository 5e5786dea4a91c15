// Input validation for API request bodies
//
// Checks accumulate into a list of field issues; a non-empty list becomes
// a 400 response carrying every issue at once.

use std::sync::OnceLock;

use marketplace_core::{DomainError, ValidationIssue};
use regex::Regex;

// =============================================================================
// Limits
// =============================================================================

/// Maximum template title length (characters).
pub const MAX_TITLE_CHARS: usize = 255;

/// Minimum length for person names (signup, checkout).
pub const MIN_NAME_CHARS: usize = 2;

/// Maximum size of an uploaded image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024; // 5 MB

/// Maximum size of an uploaded template resource.
pub const MAX_RESOURCE_BYTES: usize = 100 * 1024 * 1024; // 100 MB

// =============================================================================
// Validator
// =============================================================================

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|_| unreachable!())
    })
}

/// Trim and lowercase an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

pub fn is_valid_url(value: &str) -> bool {
    match url::Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, path: &str, message: &str) {
        self.issues.push(ValidationIssue::new(path, message));
    }

    /// Required string: present and non-blank. Returns the trimmed value.
    pub fn required<'a>(&mut self, path: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.issue(path, &format!("{path} is required"));
                None
            }
        }
    }

    pub fn min_chars(&mut self, path: &str, value: &str, min: usize) {
        if value.trim().chars().count() < min {
            self.issue(path, &format!("{path} must be at least {min} characters"));
        }
    }

    pub fn max_chars(&mut self, path: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.issue(path, &format!("{path} must be at most {max} characters"));
        }
    }

    pub fn non_blank(&mut self, path: &str, value: &str) {
        if value.trim().is_empty() {
            self.issue(path, &format!("{path} must not be empty"));
        }
    }

    pub fn email(&mut self, path: &str, value: &str) {
        if !is_valid_email(value) {
            self.issue(path, "Invalid email address");
        }
    }

    pub fn url(&mut self, path: &str, value: &str) {
        if !is_valid_url(value) {
            self.issue(path, "Invalid URL");
        }
    }

    pub fn non_negative(&mut self, path: &str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.issue(path, &format!("{path} must be a non-negative number"));
        }
    }

    pub fn finish(self) -> Result<(), DomainError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.issues))
        }
    }
}
