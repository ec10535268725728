use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::{self, UploadError, UploadFile, UploadTarget, STORAGE_BUCKET};

const FILE_FIELD: &str = "file";

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> AppResult<Json<Value>> {
    let file = read_file_field(multipart)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file provided".into()))?;

    let target = UploadTarget::for_file(&file.original_name);
    let store = state.blobs.for_request();

    let uploaded = storage::upload_with_bootstrap(store.as_ref(), STORAGE_BUCKET, &target, &file)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, path = target.path(), "Upload error");
            match e {
                UploadError::Store(source) => AppError::Upstream(source.to_string()),
                UploadError::Provision { .. } => AppError::Upstream(format!(
                    "Bucket not found. Create a bucket named \"{}\" in the storage dashboard.",
                    STORAGE_BUCKET
                )),
            }
        })?;

    tracing::info!(path = %uploaded.path, bytes = file.data.len(), "File uploaded");

    Ok(Json(json!({
        "success": true,
        "path": uploaded.path,
        "url": uploaded.url,
    })))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", e))
    }
}

/// Pulls the `file` part out of the form, skipping any other fields.
/// A `file` part without a filename is a plain text field, not a file.
async fn read_file_field(mut multipart: Multipart) -> AppResult<Option<UploadFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&original_name)
                    .first_or_octet_stream()
                    .to_string()
            });
        let data = field
            .bytes()
            .await
            .map_err(multipart_error)?;

        return Ok(Some(UploadFile {
            original_name,
            content_type,
            data,
        }));
    }

    Ok(None)
}
