// Template service: catalogue CRUD and tag association reconciliation

use marketplace_core::tag_sync::dedup_preserving_order;
use marketplace_core::{DomainError, PageRequest, Pagination, Result, Template, TemplateFilter};
use uuid::Uuid;

use crate::api::templates::{CreateTemplateRequest, UpdateTemplateRequest};
use crate::api::validation::{Validator, MAX_TITLE_CHARS};
use crate::storage::{CreateTemplateRow, StorageBackend, UpdateTemplateRow};

/// Parse requested tag ids. Unparseable entries are reported the same way
/// as ids that do not exist.
pub fn parse_tag_ids(raw: &[String]) -> Result<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(raw.len());
    let mut invalid = Vec::new();
    for value in raw {
        match Uuid::parse_str(value.trim()) {
            Ok(id) => ids.push(id),
            Err(_) => invalid.push(value.clone()),
        }
    }
    if !invalid.is_empty() {
        return Err(DomainError::InvalidReference(invalid));
    }
    Ok(dedup_preserving_order(&ids))
}

/// Blank optional URLs are treated as absent.
fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_create(req: CreateTemplateRequest) -> Result<(CreateTemplateRow, Vec<Uuid>)> {
    let mut v = Validator::new();

    let title = v.required("title", req.title.as_deref());
    if let Some(title) = title {
        v.max_chars("title", title, MAX_TITLE_CHARS);
    }
    let description = v.required("description", req.description.as_deref());
    let content = v.required("content", req.content.as_deref());
    let cover_image = v.required("coverImage", req.cover_image.as_deref());
    if let Some(url) = cover_image {
        v.url("coverImage", url);
    }
    match req.price {
        Some(price) => v.non_negative("price", price),
        None => v.issue("price", "price is required"),
    }
    if let Some(offer) = req.offer_price {
        v.non_negative("offerPrice", offer);
    }
    let resource = optional_text(req.resource.clone());
    if let Some(url) = &resource {
        v.url("resource", url);
    }
    v.finish()?;

    let (Some(title), Some(description), Some(content), Some(cover_image), Some(price)) =
        (title, description, content, cover_image, req.price)
    else {
        return Err(DomainError::invalid("body", "Invalid template"));
    };

    let tag_ids = parse_tag_ids(req.tag_ids.as_deref().unwrap_or_default())?;

    let input = CreateTemplateRow {
        title: title.to_string(),
        description: description.to_string(),
        cover_image: cover_image.to_string(),
        content: content.to_string(),
        price,
        offer_price: req.offer_price,
        resource,
        details: req.details.unwrap_or_default(),
    };
    Ok((input, tag_ids))
}

fn validate_update(req: UpdateTemplateRequest) -> Result<(UpdateTemplateRow, Option<Vec<Uuid>>)> {
    let mut v = Validator::new();

    if let Some(title) = &req.title {
        v.non_blank("title", title);
        v.max_chars("title", title.trim(), MAX_TITLE_CHARS);
    }
    if let Some(description) = &req.description {
        v.non_blank("description", description);
    }
    if let Some(content) = &req.content {
        v.non_blank("content", content);
    }
    if let Some(url) = &req.cover_image {
        v.url("coverImage", url);
    }
    if let Some(price) = req.price {
        v.non_negative("price", price);
    }
    if let Some(offer) = req.offer_price {
        v.non_negative("offerPrice", offer);
    }
    let resource = optional_text(req.resource.clone());
    if let Some(url) = &resource {
        v.url("resource", url);
    }
    v.finish()?;

    let tag_ids = req.tag_ids.as_deref().map(parse_tag_ids).transpose()?;

    let input = UpdateTemplateRow {
        title: req.title.map(|s| s.trim().to_string()),
        description: req.description.map(|s| s.trim().to_string()),
        cover_image: req.cover_image.map(|s| s.trim().to_string()),
        content: req.content.map(|s| s.trim().to_string()),
        price: req.price,
        offer_price: req.offer_price,
        resource,
        details: req.details,
    };
    Ok((input, tag_ids))
}

pub struct TemplateService {
    db: StorageBackend,
}

impl TemplateService {
    pub fn new(db: StorageBackend) -> Self {
        Self { db }
    }

    pub async fn create(&self, req: CreateTemplateRequest) -> Result<Template> {
        let (input, tag_ids) = validate_create(req)?;
        let created = self.db.create_template(input, tag_ids).await?;
        tracing::info!(
            template_id = %created.row.id,
            tags = created.tags.len(),
            "Template created"
        );
        Ok(created.into_template(true))
    }

    pub async fn get(&self, id: Uuid, include_tags: bool) -> Result<Option<Template>> {
        let template = self.db.get_template(id).await?;
        Ok(template.map(|t| t.into_template(include_tags)))
    }

    pub async fn list(
        &self,
        filter: &TemplateFilter,
        page: PageRequest,
        include_tags: bool,
    ) -> Result<(Vec<Template>, Pagination)> {
        let (rows, total) = self.db.list_templates(filter, page).await?;
        let templates = rows
            .into_iter()
            .map(|t| t.into_template(include_tags))
            .collect();
        Ok((templates, Pagination::new(page, total)))
    }

    /// Apply a partial update. When `tagIds` is present the association set
    /// becomes exactly that list.
    pub async fn update(&self, id: Uuid, req: UpdateTemplateRequest) -> Result<Option<Template>> {
        let (input, tag_ids) = validate_update(req)?;
        let updated = self.db.update_template(id, input, tag_ids).await?;
        if let Some(t) = &updated {
            tracing::info!(template_id = %t.row.id, "Template updated");
        }
        Ok(updated.map(|t| t.into_template(true)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let deleted = self.db.delete_template(id).await?;
        if deleted {
            tracing::info!(template_id = %id, "Template deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(tag_ids: Vec<String>) -> CreateTemplateRequest {
        CreateTemplateRequest {
            title: Some("Admin Dashboard".to_string()),
            description: Some("A dashboard starter".to_string()),
            cover_image: Some("https://cdn.example.com/cover.png".to_string()),
            content: Some("# Dashboard".to_string()),
            price: Some(49.0),
            offer_price: Some(29.0),
            resource: None,
            details: None,
            tag_ids: Some(tag_ids),
        }
    }

    #[test]
    fn test_parse_tag_ids_dedups_and_reports_garbage() {
        let a = Uuid::now_v7();
        let ids = parse_tag_ids(&[a.to_string(), a.to_string()]).unwrap();
        assert_eq!(ids, vec![a]);

        let err = parse_tag_ids(&[a.to_string(), "nope".to_string()]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidReference(ids) if ids == vec!["nope".to_string()]));
    }

    #[test]
    fn test_create_validation_collects_issues() {
        let req = CreateTemplateRequest {
            title: Some("x".repeat(256)),
            description: None,
            cover_image: Some("not-a-url".to_string()),
            content: Some("body".to_string()),
            price: Some(-1.0),
            offer_price: None,
            resource: Some("   ".to_string()),
            details: None,
            tag_ids: None,
        };
        match validate_create(req) {
            Err(DomainError::Validation(issues)) => {
                let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
                assert_eq!(paths, vec!["title", "description", "coverImage", "price"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_with_unknown_tag_persists_nothing() {
        let db = StorageBackend::in_memory();
        let service = TemplateService::new(db.clone());
        let missing = Uuid::now_v7();

        let err = service
            .create(create_request(vec![missing.to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidReference(_)));

        let (templates, pagination) = service
            .list(&TemplateFilter::default(), PageRequest::default(), false)
            .await
            .unwrap();
        assert!(templates.is_empty());
        assert_eq!(pagination.total_count, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_tag_set() {
        let db = StorageBackend::in_memory();
        let service = TemplateService::new(db.clone());
        let a = db.create_tag("react").await.unwrap();
        let b = db.create_tag("nextjs").await.unwrap();
        let c = db.create_tag("tailwind").await.unwrap();

        let created = service
            .create(create_request(vec![a.id.to_string(), b.id.to_string()]))
            .await
            .unwrap();
        assert_eq!(created.tags.as_ref().map(Vec::len), Some(2));

        let updated = service
            .update(
                created.id,
                UpdateTemplateRequest {
                    tag_ids: Some(vec![b.id.to_string(), c.id.to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        let mut names: Vec<_> = updated
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["nextjs", "tailwind"]);
        assert_eq!(updated.title, "Admin Dashboard");
    }

    #[tokio::test]
    async fn test_update_missing_template_is_none() {
        let service = TemplateService::new(StorageBackend::in_memory());
        let result = service
            .update(Uuid::now_v7(), UpdateTemplateRequest::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
