// In-memory storage implementation for dev mode and tests
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
// Decision: Multi-table writes take every involved lock up front, always in the
// order users, otps, templates, tags, template_tags, orders
//
// This implementation mirrors the PostgreSQL repository API (including the
// all-or-nothing behavior of its transactions), allowing the control-plane to
// run without a database.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use marketplace_core::tag_sync::{dedup_preserving_order, TagReconciliation};
use marketplace_core::{PageRequest, TemplateFilter};
use parking_lot::RwLock;
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use super::models::*;

const EMAIL_TAKEN: &str = "User already exists";
const TAG_TAKEN: &str = "Tag already exists";

/// In-memory database for dev mode
/// All data is stored in memory and lost on restart
#[derive(Default)]
pub struct InMemoryDatabase {
    users: RwLock<HashMap<Uuid, UserRow>>,
    otps: RwLock<HashMap<Uuid, OtpRow>>,
    templates: RwLock<HashMap<Uuid, TemplateRow>>,
    tags: RwLock<HashMap<Uuid, TagRow>>,
    template_tags: RwLock<HashSet<(Uuid, Uuid)>>,
    orders: RwLock<HashMap<Uuid, OrderRow>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ============================================
    // Users
    // ============================================

    pub async fn create_user(&self, input: CreateUserRow) -> StoreResult<UserRow> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == input.email) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }
        let now = Self::now();
        let row = UserRow {
            id: Uuid::now_v7(),
            name: input.name,
            email: input.email,
            role: input.role.as_str().to_string(),
            is_verified: false,
            token_hash: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(row.id, row.clone());
        Ok(row)
    }

    pub async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        Ok(self.users.read().get(&id).cloned())
    }

    pub async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    pub async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<UserRow>, i64)> {
        let users = self.users.read();
        let mut all: Vec<_> = users.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = all.len() as i64;
        Ok((paginate(all, page), total))
    }

    pub async fn update_user(&self, id: Uuid, input: UpdateUserRow) -> StoreResult<Option<UserRow>> {
        let mut users = self.users.write();
        if let Some(email) = &input.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
            }
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(role) = input.role {
            user.role = role.as_str().to_string();
        }
        user.updated_at = Self::now();
        Ok(Some(user.clone()))
    }

    pub async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut users = self.users.write();
        let mut otps = self.otps.write();
        let mut orders = self.orders.write();
        if users.remove(&id).is_none() {
            return Ok(false);
        }
        otps.remove(&id);
        orders.retain(|_, o| o.user_id != id);
        Ok(true)
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
        let users = self.users.read();
        let mut otps = self.otps.write();
        if !users.contains_key(&user_id) {
            return Err(StoreError::InvalidReference(vec![user_id.to_string()]));
        }
        let row = OtpRow {
            user_id,
            otp: otp.to_string(),
            expire_at,
            created_at: Self::now(),
        };
        otps.insert(user_id, row.clone());
        Ok(row)
    }

    pub async fn get_otp(&self, user_id: Uuid) -> StoreResult<Option<OtpRow>> {
        Ok(self.otps.read().get(&user_id).cloned())
    }

    pub async fn complete_verification(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> StoreResult<VerificationOutcome> {
        let mut users = self.users.write();
        let mut otps = self.otps.write();

        if !otps.contains_key(&user_id) {
            return Ok(VerificationOutcome::OtpConsumed);
        }
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(VerificationOutcome::UserMissing);
        };

        otps.remove(&user_id);
        user.is_verified = true;
        user.token_hash = Some(token_hash.to_string());
        user.updated_at = Self::now();
        Ok(VerificationOutcome::Verified(user.clone()))
    }

    // ============================================
    // Templates
    // ============================================

    pub async fn create_template(
        &self,
        input: CreateTemplateRow,
        tag_ids: Vec<Uuid>,
    ) -> StoreResult<TemplateWithTags> {
        let details = serde_json::to_value(&input.details).map_err(anyhow::Error::from)?;
        let tag_ids = dedup_preserving_order(&tag_ids);

        let mut templates = self.templates.write();
        let tags = self.tags.read();
        let mut template_tags = self.template_tags.write();

        ensure_tags_exist(&tags, &tag_ids)?;

        let now = Self::now();
        let row = TemplateRow {
            id: Uuid::now_v7(),
            title: input.title,
            description: input.description,
            cover_image: input.cover_image,
            content: input.content,
            price: input.price,
            offer_price: input.offer_price,
            resource: input.resource,
            details,
            created_at: now,
            updated_at: now,
        };
        templates.insert(row.id, row.clone());
        for tag_id in &tag_ids {
            template_tags.insert((row.id, *tag_id));
        }

        let tags = tags_for_template(&tags, &template_tags, row.id);
        Ok(TemplateWithTags { row, tags })
    }

    pub async fn update_template(
        &self,
        id: Uuid,
        input: UpdateTemplateRow,
        tag_ids: Option<Vec<Uuid>>,
    ) -> StoreResult<Option<TemplateWithTags>> {
        let details = input
            .details
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(anyhow::Error::from)?;

        let mut templates = self.templates.write();
        let tags = self.tags.read();
        let mut template_tags = self.template_tags.write();

        if !templates.contains_key(&id) {
            return Ok(None);
        }
        // Validate before mutating anything so a failure leaves no partial write
        if let Some(target) = &tag_ids {
            ensure_tags_exist(&tags, target)?;
        }

        let Some(row) = templates.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = input.title {
            row.title = title;
        }
        if let Some(description) = input.description {
            row.description = description;
        }
        if let Some(cover_image) = input.cover_image {
            row.cover_image = cover_image;
        }
        if let Some(content) = input.content {
            row.content = content;
        }
        if let Some(price) = input.price {
            row.price = price;
        }
        if let Some(offer_price) = input.offer_price {
            row.offer_price = Some(offer_price);
        }
        if let Some(resource) = input.resource {
            row.resource = Some(resource);
        }
        if let Some(details) = details {
            row.details = details;
        }
        row.updated_at = Self::now();
        let row = row.clone();

        if let Some(target) = tag_ids {
            let current: Vec<Uuid> = template_tags
                .iter()
                .filter(|(template_id, _)| *template_id == id)
                .map(|(_, tag_id)| *tag_id)
                .collect();
            let plan = TagReconciliation::plan(&current, &target);
            for tag_id in &plan.to_remove {
                template_tags.remove(&(id, *tag_id));
            }
            for tag_id in &plan.to_add {
                template_tags.insert((id, *tag_id));
            }
        }

        let tags = tags_for_template(&tags, &template_tags, id);
        Ok(Some(TemplateWithTags { row, tags }))
    }

    pub async fn get_template(&self, id: Uuid) -> StoreResult<Option<TemplateWithTags>> {
        let templates = self.templates.read();
        let tags = self.tags.read();
        let template_tags = self.template_tags.read();

        Ok(templates.get(&id).map(|row| TemplateWithTags {
            row: row.clone(),
            tags: tags_for_template(&tags, &template_tags, id),
        }))
    }

    pub async fn list_templates(
        &self,
        filter: &TemplateFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<TemplateWithTags>, i64)> {
        let templates = self.templates.read();
        let tags = self.tags.read();
        let template_tags = self.template_tags.read();

        let mut matching: Vec<TemplateWithTags> = templates
            .values()
            .map(|row| TemplateWithTags {
                row: row.clone(),
                tags: tags_for_template(&tags, &template_tags, row.id),
            })
            .filter(|t| {
                let names: Vec<&str> = t.tags.iter().map(|g| g.name.as_str()).collect();
                filter.matches(&t.row.title, &t.row.description, t.row.price, &names)
            })
            .collect();
        matching.sort_by(|a, b| {
            b.row
                .created_at
                .cmp(&a.row.created_at)
                .then(b.row.id.cmp(&a.row.id))
        });

        let total = matching.len() as i64;
        Ok((paginate(matching, page), total))
    }

    pub async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        let mut templates = self.templates.write();
        let mut template_tags = self.template_tags.write();
        let mut orders = self.orders.write();
        if templates.remove(&id).is_none() {
            return Ok(false);
        }
        template_tags.retain(|(template_id, _)| *template_id != id);
        orders.retain(|_, o| o.template_id != id);
        Ok(true)
    }

    // ============================================
    // Tags
    // ============================================

    pub async fn create_tag(&self, name: &str) -> StoreResult<TagRow> {
        let mut tags = self.tags.write();
        if tags.values().any(|t| t.name == name) {
            return Err(StoreError::Conflict(TAG_TAKEN.to_string()));
        }
        let now = Self::now();
        let row = TagRow {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tags.insert(row.id, row.clone());
        Ok(row)
    }

    pub async fn get_tag(&self, id: Uuid) -> StoreResult<Option<TagWithTemplates>> {
        let templates = self.templates.read();
        let tags = self.tags.read();
        let template_tags = self.template_tags.read();

        Ok(tags.get(&id).map(|row| TagWithTemplates {
            row: row.clone(),
            templates: templates_for_tag(&templates, &template_tags, id),
        }))
    }

    pub async fn list_tags(&self) -> StoreResult<Vec<TagWithTemplates>> {
        let templates = self.templates.read();
        let tags = self.tags.read();
        let template_tags = self.template_tags.read();

        let mut result: Vec<TagWithTemplates> = tags
            .values()
            .map(|row| TagWithTemplates {
                row: row.clone(),
                templates: templates_for_tag(&templates, &template_tags, row.id),
            })
            .collect();
        result.sort_by(|a, b| {
            b.row
                .created_at
                .cmp(&a.row.created_at)
                .then(b.row.id.cmp(&a.row.id))
        });
        Ok(result)
    }

    pub async fn update_tag(&self, id: Uuid, name: &str) -> StoreResult<Option<TagRow>> {
        let mut tags = self.tags.write();
        if !tags.contains_key(&id) {
            return Ok(None);
        }
        if tags.values().any(|t| t.id != id && t.name == name) {
            return Err(StoreError::Conflict(TAG_TAKEN.to_string()));
        }
        let Some(tag) = tags.get_mut(&id) else {
            return Ok(None);
        };
        tag.name = name.to_string();
        tag.updated_at = Self::now();
        Ok(Some(tag.clone()))
    }

    pub async fn delete_tag(&self, id: Uuid) -> StoreResult<Option<TagRow>> {
        let mut tags = self.tags.write();
        let mut template_tags = self.template_tags.write();
        let removed = tags.remove(&id);
        if removed.is_some() {
            template_tags.retain(|(_, tag_id)| *tag_id != id);
        }
        Ok(removed)
    }

    // ============================================
    // Orders
    // ============================================

    pub async fn create_order(&self, input: CreateOrderRow) -> StoreResult<OrderRow> {
        let users = self.users.read();
        let templates = self.templates.read();
        let mut orders = self.orders.write();

        let mut missing = Vec::new();
        if !users.contains_key(&input.user_id) {
            missing.push(input.user_id.to_string());
        }
        if !templates.contains_key(&input.template_id) {
            missing.push(input.template_id.to_string());
        }
        if !missing.is_empty() {
            return Err(StoreError::InvalidReference(missing));
        }

        let now = Self::now();
        let row = OrderRow {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            template_id: input.template_id,
            amount: input.amount,
            status: "PENDING".to_string(),
            created_at: now,
            updated_at: now,
        };
        orders.insert(row.id, row.clone());
        Ok(row)
    }

    /// Number of stored orders (test inspection)
    pub fn order_count(&self) -> usize {
        self.orders.read().len()
    }

    /// Number of template/tag association rows (test inspection)
    pub fn association_count(&self) -> usize {
        self.template_tags.read().len()
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

fn ensure_tags_exist(tags: &HashMap<Uuid, TagRow>, tag_ids: &[Uuid]) -> StoreResult<()> {
    let missing: Vec<String> = dedup_preserving_order(tag_ids)
        .into_iter()
        .filter(|id| !tags.contains_key(id))
        .map(|id| id.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::InvalidReference(missing))
    }
}

fn tags_for_template(
    tags: &HashMap<Uuid, TagRow>,
    template_tags: &HashSet<(Uuid, Uuid)>,
    template_id: Uuid,
) -> Vec<TagRow> {
    let mut result: Vec<TagRow> = template_tags
        .iter()
        .filter(|(t, _)| *t == template_id)
        .filter_map(|(_, tag_id)| tags.get(tag_id).cloned())
        .collect();
    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}

fn templates_for_tag(
    templates: &HashMap<Uuid, TemplateRow>,
    template_tags: &HashSet<(Uuid, Uuid)>,
    tag_id: Uuid,
) -> Vec<TemplateRow> {
    let mut result: Vec<TemplateRow> = template_tags
        .iter()
        .filter(|(_, g)| *g == tag_id)
        .filter_map(|(template_id, _)| templates.get(template_id).cloned())
        .collect();
    result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    result
}
