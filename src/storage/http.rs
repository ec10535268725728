use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{BlobStore, StorageError};

/// Blob store reached over the storage REST API.
///
/// Every request carries the configured key both as a bearer token and as
/// the `apikey` header.
#[derive(Clone)]
pub struct HttpBlobStore {
    http: reqwest::Client,
    base_url: String,
    key: String,
}

/// Error payload returned by the storage API. `statusCode` is sometimes a
/// string and sometimes a number.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    status_code: Option<serde_json::Value>,
    error: Option<String>,
    message: Option<String>,
}

impl HttpBlobStore {
    pub fn new(http: reqwest::Client, base_url: &str, key: String) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            key,
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }

    async fn error_from(response: reqwest::Response) -> StorageError {
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return StorageError::Transport(e),
        };

        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let code = body.status_code.map(|value| match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        let message = body
            .message
            .or_else(|| body.error.clone())
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    status.to_string()
                } else {
                    text.clone()
                }
            });

        StorageError::classify(
            status.as_u16(),
            code.as_deref(),
            body.error.as_deref(),
            &message,
        )
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let response = self
            .http
            .post(self.object_url(bucket, path))
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(path.to_string())
    }

    async fn create_bucket(&self, bucket: &str, public: bool) -> Result<(), StorageError> {
        let response = self
            .http
            .post(format!("{}/storage/v1/bucket", self.base_url))
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .json(&json!({
                "id": bucket,
                "name": bucket,
                "public": public,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }
}
