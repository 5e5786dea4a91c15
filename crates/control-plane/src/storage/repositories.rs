// Repository layer for PostgreSQL
// Decision: Ids are generated application-side (UUID v7) so both backends agree
// Decision: Multi-row writes (OTP finalize, template create/update) run in one transaction

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use marketplace_core::tag_sync::{dedup_preserving_order, TagReconciliation};
use marketplace_core::{PageRequest, TemplateFilter};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::error::{unique_violation, StoreError, StoreResult};
use super::models::*;

const EMAIL_TAKEN: &str = "User already exists";
const TAG_TAKEN: &str = "Tag already exists";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Users
    // ============================================

    pub async fn create_user(&self, input: CreateUserRow) -> StoreResult<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, role, is_verified)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id, name, email, role, is_verified, token_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.name)
        .bind(&input.email)
        .bind(input.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, EMAIL_TAKEN))
    }

    pub async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, is_verified, token_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, is_verified, token_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<UserRow>, i64)> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, is_verified, token_hash, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn update_user(&self, id: Uuid, input: UpdateUserRow) -> StoreResult<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, role, is_verified, token_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.name)
        .bind(input.email)
        .bind(input.role.map(|r| r.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, EMAIL_TAKEN))
    }

    pub async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // OTP verification
    // ============================================

    /// Insert or replace the single pending OTP for a user
    pub async fn upsert_otp(
        &self,
        user_id: Uuid,
        otp: &str,
        expire_at: DateTime<Utc>,
    ) -> StoreResult<OtpRow> {
        let row = sqlx::query_as::<_, OtpRow>(
            r#"
            INSERT INTO otp_verifications (user_id, otp, expire_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET otp = EXCLUDED.otp, expire_at = EXCLUDED.expire_at, created_at = NOW()
            RETURNING user_id, otp, expire_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(otp)
        .bind(expire_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_otp(&self, user_id: Uuid) -> StoreResult<Option<OtpRow>> {
        let row = sqlx::query_as::<_, OtpRow>(
            r#"
            SELECT user_id, otp, expire_at, created_at
            FROM otp_verifications
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Consume the pending OTP, mark the user verified, and record the session token hash.
    /// All three happen or none do.
    pub async fn complete_verification(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> StoreResult<VerificationOutcome> {
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query("DELETE FROM otp_verifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if consumed.rows_affected() == 0 {
            return Ok(VerificationOutcome::OtpConsumed);
        }

        let user = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET is_verified = TRUE, token_hash = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, role, is_verified, token_hash, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = user else {
            return Ok(VerificationOutcome::UserMissing);
        };

        tx.commit().await?;
        Ok(VerificationOutcome::Verified(user))
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

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            INSERT INTO templates (id, title, description, cover_image, content, price, offer_price, resource, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, title, description, cover_image, content, price, offer_price, resource, details, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.cover_image)
        .bind(&input.content)
        .bind(input.price)
        .bind(input.offer_price)
        .bind(&input.resource)
        .bind(&details)
        .fetch_one(&mut *tx)
        .await?;

        ensure_tags_exist(&mut tx, &tag_ids).await?;
        insert_associations(&mut tx, row.id, &tag_ids).await?;
        let tags = tags_for_template(&mut tx, row.id).await?;

        tx.commit().await?;
        Ok(TemplateWithTags { row, tags })
    }

    /// Apply a partial update and, when `tag_ids` is given, reconcile associations to it.
    /// Returns `None` when the template does not exist.
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

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            UPDATE templates
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                cover_image = COALESCE($4, cover_image),
                content = COALESCE($5, content),
                price = COALESCE($6, price),
                offer_price = COALESCE($7, offer_price),
                resource = COALESCE($8, resource),
                details = COALESCE($9, details),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, cover_image, content, price, offer_price, resource, details, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.title)
        .bind(input.description)
        .bind(input.cover_image)
        .bind(input.content)
        .bind(input.price)
        .bind(input.offer_price)
        .bind(input.resource)
        .bind(details)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if let Some(target) = tag_ids {
            ensure_tags_exist(&mut tx, &target).await?;

            let current: Vec<Uuid> = sqlx::query_scalar(
                "SELECT tag_id FROM template_tags WHERE template_id = $1",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            let plan = TagReconciliation::plan(&current, &target);
            if !plan.to_remove.is_empty() {
                sqlx::query("DELETE FROM template_tags WHERE template_id = $1 AND tag_id = ANY($2)")
                    .bind(id)
                    .bind(&plan.to_remove)
                    .execute(&mut *tx)
                    .await?;
            }
            insert_associations(&mut tx, id, &plan.to_add).await?;
            tracing::debug!(
                template_id = %id,
                added = plan.to_add.len(),
                removed = plan.to_remove.len(),
                "Reconciled template tags"
            );
        }

        let tags = tags_for_template(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Some(TemplateWithTags { row, tags }))
    }

    pub async fn get_template(&self, id: Uuid) -> StoreResult<Option<TemplateWithTags>> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, title, description, cover_image, content, price, offer_price, resource, details, created_at, updated_at
            FROM templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await?;
        let tags = tags_for_template(&mut conn, id).await?;
        Ok(Some(TemplateWithTags { row, tags }))
    }

    pub async fn list_templates(
        &self,
        filter: &TemplateFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<TemplateWithTags>, i64)> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let tag_name = filter
            .tag_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT t.id, t.title, t.description, t.cover_image, t.content, t.price, t.offer_price,
                   t.resource, t.details, t.created_at, t.updated_at
            FROM templates t
            WHERE ($1::text IS NULL
                   OR strpos(lower(t.title), lower($1)) > 0
                   OR strpos(lower(t.description), lower($1)) > 0)
              AND ($2::text IS NULL OR EXISTS (
                   SELECT 1 FROM template_tags tt
                   JOIN tags g ON g.id = tt.tag_id
                   WHERE tt.template_id = t.id AND lower(g.name) = lower($2)))
              AND ($3::float8 IS NULL OR t.price >= $3)
              AND ($4::float8 IS NULL OR t.price <= $4)
            ORDER BY t.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(search)
        .bind(tag_name)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM templates t
            WHERE ($1::text IS NULL
                   OR strpos(lower(t.title), lower($1)) > 0
                   OR strpos(lower(t.description), lower($1)) > 0)
              AND ($2::text IS NULL OR EXISTS (
                   SELECT 1 FROM template_tags tt
                   JOIN tags g ON g.id = tt.tag_id
                   WHERE tt.template_id = t.id AND lower(g.name) = lower($2)))
              AND ($3::float8 IS NULL OR t.price >= $3)
              AND ($4::float8 IS NULL OR t.price <= $4)
            "#,
        )
        .bind(search)
        .bind(tag_name)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .fetch_one(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let joins = sqlx::query_as::<_, TemplateTagJoinRow>(
            r#"
            SELECT tt.template_id, g.id AS tag_id, g.name AS tag_name,
                   g.created_at AS tag_created_at, g.updated_at AS tag_updated_at
            FROM template_tags tt
            JOIN tags g ON g.id = tt.tag_id
            WHERE tt.template_id = ANY($1)
            ORDER BY g.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_template: HashMap<Uuid, Vec<TagRow>> = HashMap::new();
        for join in &joins {
            by_template.entry(join.template_id).or_default().push(join.tag());
        }

        let templates = rows
            .into_iter()
            .map(|row| {
                let tags = by_template.remove(&row.id).unwrap_or_default();
                TemplateWithTags { row, tags }
            })
            .collect();

        Ok((templates, total))
    }

    pub async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // Tags
    // ============================================

    pub async fn create_tag(&self, name: &str) -> StoreResult<TagRow> {
        sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (id, name)
            VALUES ($1, $2)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, TAG_TAKEN))
    }

    pub async fn get_tag(&self, id: Uuid) -> StoreResult<Option<TagWithTemplates>> {
        let row = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, created_at, updated_at FROM tags WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut with_templates = self.attach_templates(vec![row]).await?;
        Ok(with_templates.pop())
    }

    pub async fn list_tags(&self) -> StoreResult<Vec<TagWithTemplates>> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, created_at, updated_at FROM tags ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        self.attach_templates(rows).await
    }

    pub async fn update_tag(&self, id: Uuid, name: &str) -> StoreResult<Option<TagRow>> {
        sqlx::query_as::<_, TagRow>(
            r#"
            UPDATE tags
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, TAG_TAKEN))
    }

    pub async fn delete_tag(&self, id: Uuid) -> StoreResult<Option<TagRow>> {
        let row = sqlx::query_as::<_, TagRow>(
            "DELETE FROM tags WHERE id = $1 RETURNING id, name, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn attach_templates(&self, tags: Vec<TagRow>) -> StoreResult<Vec<TagWithTemplates>> {
        let ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();

        #[derive(sqlx::FromRow)]
        struct TagTemplateRow {
            tag_id: Uuid,
            #[sqlx(flatten)]
            template: TemplateRow,
        }

        let joins = sqlx::query_as::<_, TagTemplateRow>(
            r#"
            SELECT tt.tag_id, t.id, t.title, t.description, t.cover_image, t.content, t.price,
                   t.offer_price, t.resource, t.details, t.created_at, t.updated_at
            FROM template_tags tt
            JOIN templates t ON t.id = tt.template_id
            WHERE tt.tag_id = ANY($1)
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_tag: HashMap<Uuid, Vec<TemplateRow>> = HashMap::new();
        for join in joins {
            by_tag.entry(join.tag_id).or_default().push(join.template);
        }

        Ok(tags
            .into_iter()
            .map(|row| {
                let templates = by_tag.remove(&row.id).unwrap_or_default();
                TagWithTemplates { row, templates }
            })
            .collect())
    }

    // ============================================
    // Orders
    // ============================================

    pub async fn create_order(&self, input: CreateOrderRow) -> StoreResult<OrderRow> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (id, user_id, template_id, amount, status)
            VALUES ($1, $2, $3, $4, 'PENDING')
            RETURNING id, user_id, template_id, amount, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.user_id)
        .bind(input.template_id)
        .bind(input.amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}

// ============================================
// Transaction helpers
// ============================================

/// Fail with `InvalidReference` listing every id that has no tag row.
async fn ensure_tags_exist(conn: &mut PgConnection, tag_ids: &[Uuid]) -> StoreResult<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tag_ids)
        .fetch_all(&mut *conn)
        .await?;
    let found: HashSet<Uuid> = found.into_iter().collect();

    let missing: Vec<String> = dedup_preserving_order(tag_ids)
        .into_iter()
        .filter(|id| !found.contains(id))
        .map(|id| id.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::InvalidReference(missing))
    }
}

async fn insert_associations(
    conn: &mut PgConnection,
    template_id: Uuid,
    tag_ids: &[Uuid],
) -> StoreResult<()> {
    for tag_id in tag_ids {
        sqlx::query(
            r#"
            INSERT INTO template_tags (template_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT (template_id, tag_id) DO NOTHING
            "#,
        )
        .bind(template_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn tags_for_template(conn: &mut PgConnection, template_id: Uuid) -> StoreResult<Vec<TagRow>> {
    let rows = sqlx::query_as::<_, TagRow>(
        r#"
        SELECT g.id, g.name, g.created_at, g.updated_at
        FROM template_tags tt
        JOIN tags g ON g.id = tt.tag_id
        WHERE tt.template_id = $1
        ORDER BY g.name
        "#,
    )
    .bind(template_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
