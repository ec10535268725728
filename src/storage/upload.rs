use bytes::Bytes;
use serde::Serialize;

use super::{BlobStore, StorageError};

const FALLBACK_EXTENSION: &str = "jpg";
const UPLOAD_PREFIX: &str = "images";

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub original_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Where a single upload will be stored inside the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    path: String,
}

impl UploadTarget {
    /// Builds `images/<random uuid>.<ext>` for a new upload.
    pub fn for_file(original_name: &str) -> Self {
        Self::with_token(&uuid::Uuid::new_v4().to_string(), original_name)
    }

    pub fn with_token(token: &str, original_name: &str) -> Self {
        Self {
            path: format!("{UPLOAD_PREFIX}/{token}.{}", extension_of(original_name)),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Extension after the last dot, or the fallback when missing or unsafe.
fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()) => {
            ext.to_ascii_lowercase()
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    pub path: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The store rejected the upload and no recovery applies.
    #[error(transparent)]
    Store(StorageError),

    /// The bucket was missing and could not be created.
    #[error("could not create bucket {bucket}: {source}")]
    Provision {
        bucket: String,
        #[source]
        source: StorageError,
    },
}

/// Uploads a file, creating the bucket once if the store reports it missing.
///
/// At most one create-bucket call and one retry are made. A create that
/// fails because the bucket already exists (another request won the race)
/// still proceeds to the retry.
pub async fn upload_with_bootstrap(
    store: &dyn BlobStore,
    bucket: &str,
    target: &UploadTarget,
    file: &UploadFile,
) -> Result<UploadedObject, UploadError> {
    let first = store
        .upload(bucket, target.path(), file.data.clone(), &file.content_type)
        .await;

    let stored_path = match first {
        Ok(path) => path,
        Err(e) if e.is_bucket_not_found() => {
            tracing::warn!(bucket, error = %e, "Bucket missing, creating it");
            match store.create_bucket(bucket, true).await {
                Ok(()) => tracing::info!(bucket, "Created bucket"),
                Err(e) if e.is_already_exists() => {
                    tracing::debug!(bucket, "Bucket created concurrently")
                }
                Err(source) => {
                    tracing::error!(bucket, error = %source, "Create bucket failed");
                    return Err(UploadError::Provision {
                        bucket: bucket.to_string(),
                        source,
                    });
                }
            }

            store
                .upload(bucket, target.path(), file.data.clone(), &file.content_type)
                .await
                .map_err(UploadError::Store)?
        }
        Err(e) => return Err(UploadError::Store(e)),
    };

    let url = store.public_url(bucket, &stored_path);
    Ok(UploadedObject {
        path: stored_path,
        url,
    })
}
