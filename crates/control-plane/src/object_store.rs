// Object storage for uploaded files
// Decision: S3-compatible store through the AWS SDK, path-style addressing, static credentials
// Decision: Checksums only when an operation requires them (MinIO/R2/Supabase reject the newer defaults)
// Decision: Without STORAGE_ENDPOINT an in-memory store is used (dev mode, tests)

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use parking_lot::RwLock;

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Default)]
pub struct ObjectStoreConfig {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub public_url: Option<String>,
}

impl ObjectStoreConfig {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            endpoint: non_empty("STORAGE_ENDPOINT"),
            region: non_empty("STORAGE_REGION"),
            bucket: non_empty("STORAGE_BUCKET"),
            access_key_id: non_empty("STORAGE_ACCESS_KEY_ID"),
            secret_access_key: non_empty("STORAGE_SECRET_ACCESS_KEY"),
            public_url: non_empty("STORAGE_PUBLIC_URL"),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL of the object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// S3-compatible store (AWS, MinIO, R2, Supabase storage) with SigV4-signed requests.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: Option<String>,
    public_url: Option<String>,
}

impl S3ObjectStore {
    pub fn new(endpoint: String, config: ObjectStoreConfig) -> Result<Self> {
        let access_key_id = config
            .access_key_id
            .context("STORAGE_ACCESS_KEY_ID is not configured")?;
        let secret_access_key = config
            .secret_access_key
            .context("STORAGE_SECRET_ACCESS_KEY is not configured")?;
        let region = config
            .region
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "marketplace-env",
        );
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .endpoint_url(endpoint.trim_end_matches('/'))
            .credentials_provider(credentials)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket,
            public_url: config.public_url,
        })
    }

    fn bucket(&self) -> Result<&str> {
        self.bucket
            .as_deref()
            .ok_or_else(|| anyhow!("STORAGE_BUCKET is not configured"))
    }

    fn public_object_url(&self, bucket: &str, key: &str) -> Result<String> {
        let base = self
            .public_url
            .as_deref()
            .ok_or_else(|| anyhow!("STORAGE_PUBLIC_URL is not configured"))?;
        Ok(format!("{base}/{bucket}/{key}"))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let bucket = self.bucket()?;
        let public = self.public_object_url(bucket, key)?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| anyhow!("Object storage PUT failed: {}", DisplayErrorContext(&e)))?;

        tracing::debug!(%bucket, %key, "Stored object");
        Ok(public)
    }
}

/// Stored object held by the in-memory store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Dev-mode store keeping objects in process memory.
pub struct InMemoryObjectStore {
    bucket: String,
    public_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            public_url: public_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("uploads", "http://localhost:9000/storage")
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}/{}", self.public_url, self.bucket, key))
    }
}
