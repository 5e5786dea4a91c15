// Template domain types
//
// A template is a marketplace listing: pricing, markdown content, cover
// image, an optional downloadable resource, and free-form details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Descriptive metadata shown on the listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_with: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Tag reference embedded in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TagSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image: String,
    /// Markdown body.
    pub content: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<f64>,
    /// Downloadable resource URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub details: TemplateDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Associated tags, present when tags were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagSummary>>,
    /// Number of associated tags, present when tags were not requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_count: Option<i64>,
}

/// Compact template view embedded in a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub cover_image: String,
}

/// Listing filters. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Case-insensitive tag name equality
    pub tag_name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl TemplateFilter {
    /// Evaluate the filter against a template and the names of its tags.
    pub fn matches(&self, title: &str, description: &str, price: f64, tag_names: &[&str]) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !title.to_lowercase().contains(&needle)
                && !description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(tag) = self.tag_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !tag_names.iter().any(|name| name.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if price > max {
                return false;
            }
        }
        true
    }
}
