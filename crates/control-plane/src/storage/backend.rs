// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// This module provides a unified StorageBackend enum that can work with
// either PostgreSQL (production) or in-memory (dev mode) storage.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use marketplace_core::{PageRequest, TemplateFilter};
use uuid::Uuid;

use super::error::StoreResult;
use super::memory::InMemoryDatabase;
use super::models::*;
use super::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL and apply migrations
    pub async fn postgres(database_url: &str) -> anyhow::Result<Self> {
        let db = Database::from_url(database_url).await?;
        db.migrate().await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Check if this is dev mode (in-memory)
    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::InMemory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> StoreResult<()> {
        match self {
            Self::Postgres(db) => db.ping().await,
            Self::InMemory(_) => Ok(()),
        }
    }

    // ============================================
    // Users
    // ============================================

    pub async fn create_user(&self, input: CreateUserRow) -> StoreResult<UserRow> {
        match self {
            Self::Postgres(db) => db.create_user(input).await,
            Self::InMemory(db) => db.create_user(input).await,
        }
    }

    pub async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        match self {
            Self::Postgres(db) => db.get_user(id).await,
            Self::InMemory(db) => db.get_user(id).await,
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        match self {
            Self::Postgres(db) => db.get_user_by_email(email).await,
            Self::InMemory(db) => db.get_user_by_email(email).await,
        }
    }

    pub async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<UserRow>, i64)> {
        match self {
            Self::Postgres(db) => db.list_users(page).await,
            Self::InMemory(db) => db.list_users(page).await,
        }
    }

    pub async fn update_user(&self, id: Uuid, input: UpdateUserRow) -> StoreResult<Option<UserRow>> {
        match self {
            Self::Postgres(db) => db.update_user(id, input).await,
            Self::InMemory(db) => db.update_user(id, input).await,
        }
    }

    pub async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        match self {
            Self::Postgres(db) => db.delete_user(id).await,
            Self::InMemory(db) => db.delete_user(id).await,
        }
    }

    // ============================================
    // OTP verification
    // ============================================

    pub async fn upsert_otp(
        &self,
        user_id: Uuid,
        otp: &str,
        expire_at: DateTime<Utc>,
    ) -> StoreResult<OtpRow> {
        match self {
            Self::Postgres(db) => db.upsert_otp(user_id, otp, expire_at).await,
            Self::InMemory(db) => db.upsert_otp(user_id, otp, expire_at).await,
        }
    }

    pub async fn get_otp(&self, user_id: Uuid) -> StoreResult<Option<OtpRow>> {
        match self {
            Self::Postgres(db) => db.get_otp(user_id).await,
            Self::InMemory(db) => db.get_otp(user_id).await,
        }
    }

    pub async fn complete_verification(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> StoreResult<VerificationOutcome> {
        match self {
            Self::Postgres(db) => db.complete_verification(user_id, token_hash).await,
            Self::InMemory(db) => db.complete_verification(user_id, token_hash).await,
        }
    }

    // ============================================
    // Templates
    // ============================================

    pub async fn create_template(
        &self,
        input: CreateTemplateRow,
        tag_ids: Vec<Uuid>,
    ) -> StoreResult<TemplateWithTags> {
        match self {
            Self::Postgres(db) => db.create_template(input, tag_ids).await,
            Self::InMemory(db) => db.create_template(input, tag_ids).await,
        }
    }

    pub async fn update_template(
        &self,
        id: Uuid,
        input: UpdateTemplateRow,
        tag_ids: Option<Vec<Uuid>>,
    ) -> StoreResult<Option<TemplateWithTags>> {
        match self {
            Self::Postgres(db) => db.update_template(id, input, tag_ids).await,
            Self::InMemory(db) => db.update_template(id, input, tag_ids).await,
        }
    }

    pub async fn get_template(&self, id: Uuid) -> StoreResult<Option<TemplateWithTags>> {
        match self {
            Self::Postgres(db) => db.get_template(id).await,
            Self::InMemory(db) => db.get_template(id).await,
        }
    }

    pub async fn list_templates(
        &self,
        filter: &TemplateFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<TemplateWithTags>, i64)> {
        match self {
            Self::Postgres(db) => db.list_templates(filter, page).await,
            Self::InMemory(db) => db.list_templates(filter, page).await,
        }
    }

    pub async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        match self {
            Self::Postgres(db) => db.delete_template(id).await,
            Self::InMemory(db) => db.delete_template(id).await,
        }
    }

    // ============================================
    // Tags
    // ============================================

    pub async fn create_tag(&self, name: &str) -> StoreResult<TagRow> {
        match self {
            Self::Postgres(db) => db.create_tag(name).await,
            Self::InMemory(db) => db.create_tag(name).await,
        }
    }

    pub async fn get_tag(&self, id: Uuid) -> StoreResult<Option<TagWithTemplates>> {
        match self {
            Self::Postgres(db) => db.get_tag(id).await,
            Self::InMemory(db) => db.get_tag(id).await,
        }
    }

    pub async fn list_tags(&self) -> StoreResult<Vec<TagWithTemplates>> {
        match self {
            Self::Postgres(db) => db.list_tags().await,
            Self::InMemory(db) => db.list_tags().await,
        }
    }

    pub async fn update_tag(&self, id: Uuid, name: &str) -> StoreResult<Option<TagRow>> {
        match self {
            Self::Postgres(db) => db.update_tag(id, name).await,
            Self::InMemory(db) => db.update_tag(id, name).await,
        }
    }

    pub async fn delete_tag(&self, id: Uuid) -> StoreResult<Option<TagRow>> {
        match self {
            Self::Postgres(db) => db.delete_tag(id).await,
            Self::InMemory(db) => db.delete_tag(id).await,
        }
    }

    // ============================================
    // Orders
    // ============================================

    pub async fn create_order(&self, input: CreateOrderRow) -> StoreResult<OrderRow> {
        match self {
            Self::Postgres(db) => db.create_order(input).await,
            Self::InMemory(db) => db.create_order(input).await,
        }
    }
}
