// Database models (rows) and write inputs

use chrono::{DateTime, Utc};
use marketplace_core::{
    Order, OrderStatus, Role, Tag, TagSummary, Template, TemplateDetails, TemplateSummary, User,
};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// ============================================
// Users
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_verified: bool,
    /// SHA-256 hex of the most recently issued session token
    pub token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn role(&self) -> Role {
        Role::from(self.role.as_str())
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role(),
            is_verified: self.is_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserRow {
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserRow {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

// ============================================
// OTP verification
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct OtpRow {
    pub user_id: Uuid,
    pub otp: String,
    pub expire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Result of the atomic verification step.
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    Verified(UserRow),
    /// The pending OTP was consumed by a concurrent verification
    OtpConsumed,
    UserMissing,
}

// ============================================
// Templates
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image: String,
    pub content: String,
    pub price: f64,
    pub offer_price: Option<f64>,
    pub resource: Option<String>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateRow {
    pub fn details(&self) -> TemplateDetails {
        serde_json::from_value(self.details.clone()).unwrap_or_default()
    }

    pub fn to_summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            cover_image: self.cover_image.clone(),
        }
    }
}

/// Template with its associated tags (sorted by name).
#[derive(Debug, Clone)]
pub struct TemplateWithTags {
    pub row: TemplateRow,
    pub tags: Vec<TagRow>,
}

impl TemplateWithTags {
    pub fn tag_ids(&self) -> Vec<Uuid> {
        self.tags.iter().map(|t| t.id).collect()
    }

    /// Convert to the API shape, embedding tags or only their count.
    pub fn into_template(self, include_tags: bool) -> Template {
        let details = self.row.details();
        let (tags, tag_count) = if include_tags {
            let tags = self
                .tags
                .into_iter()
                .map(|t| TagSummary {
                    id: t.id,
                    name: t.name,
                })
                .collect();
            (Some(tags), None)
        } else {
            (None, Some(self.tags.len() as i64))
        };
        Template {
            id: self.row.id,
            title: self.row.title,
            description: self.row.description,
            cover_image: self.row.cover_image,
            content: self.row.content,
            price: self.row.price,
            offer_price: self.row.offer_price,
            resource: self.row.resource,
            details,
            created_at: self.row.created_at,
            updated_at: self.row.updated_at,
            tags,
            tag_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTemplateRow {
    pub title: String,
    pub description: String,
    pub cover_image: String,
    pub content: String,
    pub price: f64,
    pub offer_price: Option<f64>,
    pub resource: Option<String>,
    pub details: TemplateDetails,
}

/// Partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTemplateRow {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub content: Option<String>,
    pub price: Option<f64>,
    pub offer_price: Option<f64>,
    pub resource: Option<String>,
    pub details: Option<TemplateDetails>,
}

// ============================================
// Tags
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct TagRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagRow {
    /// Bare tag, without association data.
    pub fn to_tag(&self) -> Tag {
        Tag {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            templates: None,
            template_count: None,
        }
    }
}

/// Tag with its associated templates (newest first).
#[derive(Debug, Clone)]
pub struct TagWithTemplates {
    pub row: TagRow,
    pub templates: Vec<TemplateRow>,
}

impl TagWithTemplates {
    /// Convert to the API shape, embedding template summaries or only their count.
    pub fn into_tag(self, include_templates: bool) -> Tag {
        let mut tag = self.row.to_tag();
        if include_templates {
            tag.templates = Some(self.templates.iter().map(TemplateRow::to_summary).collect());
        } else {
            tag.template_count = Some(self.templates.len() as i64);
        }
        tag
    }
}

/// Join row used when loading associations in bulk.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateTagJoinRow {
    pub template_id: Uuid,
    pub tag_id: Uuid,
    pub tag_name: String,
    pub tag_created_at: DateTime<Utc>,
    pub tag_updated_at: DateTime<Utc>,
}

impl TemplateTagJoinRow {
    pub fn tag(&self) -> TagRow {
        TagRow {
            id: self.tag_id,
            name: self.tag_name.clone(),
            created_at: self.tag_created_at,
            updated_at: self.tag_updated_at,
        }
    }
}

// ============================================
// Orders
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_id: Uuid,
    pub amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn to_order(&self) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            template_id: self.template_id,
            amount: self.amount,
            status: OrderStatus::from(self.status.as_str()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateOrderRow {
    pub user_id: Uuid,
    pub template_id: Uuid,
    pub amount: f64,
}
