// Tag service: catalogue labels

use marketplace_core::{DomainError, Result, Tag};
use uuid::Uuid;

use crate::api::validation::Validator;
use crate::storage::StorageBackend;

fn tag_name(value: Option<&str>) -> Result<String> {
    let mut v = Validator::new();
    let name = v.required("name", value);
    v.finish()?;
    name.map(str::to_string)
        .ok_or_else(|| DomainError::invalid("name", "name is required"))
}

pub struct TagService {
    db: StorageBackend,
}

impl TagService {
    pub fn new(db: StorageBackend) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: Option<&str>) -> Result<Tag> {
        let name = tag_name(name)?;
        let row = self.db.create_tag(&name).await?;
        tracing::info!(tag_id = %row.id, name = %row.name, "Tag created");
        Ok(row.to_tag())
    }

    pub async fn get(&self, id: Uuid, include_templates: bool) -> Result<Option<Tag>> {
        let tag = self.db.get_tag(id).await?;
        Ok(tag.map(|t| t.into_tag(include_templates)))
    }

    /// All tags, newest first.
    pub async fn list(&self, include_templates: bool) -> Result<Vec<Tag>> {
        let tags = self.db.list_tags().await?;
        Ok(tags
            .into_iter()
            .map(|t| t.into_tag(include_templates))
            .collect())
    }

    pub async fn update(&self, id: Uuid, name: Option<&str>) -> Result<Tag> {
        let name = tag_name(name)?;
        let row = self
            .db
            .update_tag(id, &name)
            .await?
            .ok_or_else(|| DomainError::not_found("Tag"))?;
        tracing::info!(tag_id = %row.id, name = %row.name, "Tag renamed");
        Ok(row.to_tag())
    }

    pub async fn delete(&self, id: Uuid) -> Result<Tag> {
        let row = self
            .db
            .delete_tag(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Tag"))?;
        tracing::info!(tag_id = %row.id, "Tag deleted");
        Ok(row.to_tag())
    }
}
