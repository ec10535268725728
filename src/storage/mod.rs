mod http;
mod upload;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::config::StorageConfig;

pub use self::http::HttpBlobStore;
pub use self::upload::{upload_with_bootstrap, UploadError, UploadFile, UploadTarget, UploadedObject};

/// Bucket every upload lands in.
pub const STORAGE_BUCKET: &str = "uploads";

/// Failure reported by a blob store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0}")]
    BucketNotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Storage request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl StorageError {
    /// Classifies a failed response from the store.
    ///
    /// Structured codes win. When neither the HTTP status nor the body's
    /// `statusCode`/`error` fields identify the failure, the message is
    /// matched against known bucket-not-found wording.
    pub fn classify(status: u16, code: Option<&str>, error: Option<&str>, message: &str) -> Self {
        let error_kind = error.map(str::to_ascii_lowercase).unwrap_or_default();
        let code = code.and_then(|c| c.parse::<u16>().ok());

        if status == 409 || code == Some(409) || error_kind == "duplicate" || error_kind == "conflict" {
            return StorageError::AlreadyExists(message.to_string());
        }

        if error_kind == "bucket not found" || error_kind == "nosuchbucket" {
            return StorageError::BucketNotFound(message.to_string());
        }

        if looks_like_missing_bucket(message) || looks_like_missing_bucket(&error_kind) {
            return StorageError::BucketNotFound(message.to_string());
        }

        let lowered = message.to_ascii_lowercase();
        if lowered.contains("already exists") {
            return StorageError::AlreadyExists(message.to_string());
        }

        StorageError::Api {
            status: code.unwrap_or(status),
            message: message.to_string(),
        }
    }

    pub fn is_bucket_not_found(&self) -> bool {
        matches!(self, StorageError::BucketNotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists(_))
    }
}

/// Heuristic for stores that only return free text.
///
/// Can miss new upstream wording, and can misfire on unrelated messages
/// that happen to mention a bucket.
pub fn looks_like_missing_bucket(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("bucket")
        && (msg.contains("not found")
            || msg.contains("does not exist")
            || msg.contains("storagenotfound")
            || msg.contains("nosuchbucket"))
}

/// Minimal object-store surface the upload path needs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` at `path` inside `bucket`. Never overwrites.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError>;

    async fn create_bucket(&self, bucket: &str, public: bool) -> Result<(), StorageError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// The restricted client plus the elevated one when a service key is set.
#[derive(Clone)]
pub struct BlobClients {
    restricted: Arc<dyn BlobStore>,
    elevated: Option<Arc<dyn BlobStore>>,
}

impl BlobClients {
    pub fn new(restricted: Arc<dyn BlobStore>, elevated: Option<Arc<dyn BlobStore>>) -> Self {
        Self {
            restricted,
            elevated,
        }
    }

    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("campus-feed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        if config.anon_key.is_empty() {
            tracing::warn!("No storage anon key configured; uploads will likely be rejected");
        }

        let restricted: Arc<dyn BlobStore> = Arc::new(HttpBlobStore::new(
            http.clone(),
            &config.url,
            config.anon_key.clone(),
        )?);
        let elevated = match &config.service_role_key {
            Some(key) if !key.is_empty() => {
                tracing::info!("Using service-role credential for storage");
                Some(Arc::new(HttpBlobStore::new(http, &config.url, key.clone())?) as Arc<dyn BlobStore>)
            }
            _ => None,
        };

        Ok(Self::new(restricted, elevated))
    }

    /// Client for one request: elevated when configured, restricted otherwise.
    pub fn for_request(&self) -> Arc<dyn BlobStore> {
        self.elevated
            .clone()
            .unwrap_or_else(|| self.restricted.clone())
    }
}
