// Upload relay: validates files and forwards them to object storage

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use marketplace_core::{DomainError, Result};
use uuid::Uuid;

use crate::api::validation::{MAX_IMAGE_BYTES, MAX_RESOURCE_BYTES};
use crate::object_store::ObjectStore;

const DEFAULT_EXTENSION: &str = "bin";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Cover and gallery images, public
    Image,
    /// Downloadable template archives, admin only
    Resource,
}

impl UploadKind {
    pub fn max_bytes(&self) -> usize {
        match self {
            UploadKind::Image => MAX_IMAGE_BYTES,
            UploadKind::Resource => MAX_RESOURCE_BYTES,
        }
    }

    fn key_prefix(&self) -> &'static str {
        match self {
            UploadKind::Image => "",
            UploadKind::Resource => "resources/",
        }
    }
}

/// Where a stored file ended up.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub key: String,
    pub url: String,
}

/// Lowercased extension of `file_name`, or `bin`.
fn extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Object key: `[resources/]YYYY-MM-DD/<uuid>.<ext>`.
pub fn object_key(kind: UploadKind, file_name: Option<&str>, date: NaiveDate, id: Uuid) -> String {
    format!(
        "{}{}/{}.{}",
        kind.key_prefix(),
        date.format("%Y-%m-%d"),
        id,
        extension(file_name)
    )
}

pub struct UploadService {
    store: Arc<dyn ObjectStore>,
}

impl UploadService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn upload(
        &self,
        kind: UploadKind,
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<StoredFile> {
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        if kind == UploadKind::Image && !content_type.starts_with("image/") {
            return Err(DomainError::invalid("file", "Only image files are allowed"));
        }
        if bytes.len() > kind.max_bytes() {
            let limit_mb = kind.max_bytes() / (1024 * 1024);
            return Err(DomainError::invalid(
                "file",
                &format!("File exceeds the {limit_mb} MB limit"),
            ));
        }

        let key = object_key(kind, file_name, Utc::now().date_naive(), Uuid::now_v7());
        let size = bytes.len();
        let url = self
            .store
            .put(&key, bytes, content_type)
            .await
            .map_err(|e| DomainError::Storage(format!("{e:#}")))?;

        tracing::info!(%key, size, "File uploaded");
        Ok(StoredFile { key, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::InMemoryObjectStore;

    #[test]
    fn test_object_keys() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let id = Uuid::nil();
        assert_eq!(
            object_key(UploadKind::Image, Some("Cover.PNG"), date, id),
            format!("2025-03-09/{id}.png")
        );
        assert_eq!(
            object_key(UploadKind::Resource, Some("kit.tar.gz"), date, id),
            format!("resources/2025-03-09/{id}.gz")
        );
        assert_eq!(
            object_key(UploadKind::Image, Some("noext"), date, id),
            format!("2025-03-09/{id}.bin")
        );
        assert_eq!(
            object_key(UploadKind::Image, None, date, id),
            format!("2025-03-09/{id}.bin")
        );
    }

    #[tokio::test]
    async fn test_image_upload_is_stored() {
        let store = Arc::new(InMemoryObjectStore::new("media", "https://cdn.example.com"));
        let service = UploadService::new(store.clone());

        let stored = service
            .upload(UploadKind::Image, Some("a.png"), Some("image/png"), vec![0; 16])
            .await
            .unwrap();
        assert!(stored.key.ends_with(".png"));
        assert_eq!(
            stored.url,
            format!("https://cdn.example.com/media/{}", stored.key)
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_non_image_is_rejected() {
        let store = Arc::new(InMemoryObjectStore::default());
        let service = UploadService::new(store.clone());
        let err = service
            .upload(UploadKind::Image, Some("a.pdf"), Some("application/pdf"), vec![1])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_image_is_rejected() {
        let service = UploadService::new(Arc::new(InMemoryObjectStore::default()));
        let err = service
            .upload(
                UploadKind::Image,
                Some("big.png"),
                Some("image/png"),
                vec![0; MAX_IMAGE_BYTES + 1],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_resource_accepts_any_content_type() {
        let service = UploadService::new(Arc::new(InMemoryObjectStore::default()));
        let stored = service
            .upload(UploadKind::Resource, Some("kit.zip"), None, vec![0; 32])
            .await
            .unwrap();
        assert!(stored.key.starts_with("resources/"));
        assert!(stored.key.ends_with(".zip"));
    }
}
