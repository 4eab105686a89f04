use std::path::Path;

use axum::extract::{Multipart, State};
use tracing::{info, warn};
use uuid::Uuid;

use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// Accept a multipart `file` field, stash it under the upload directory,
/// ingest it into the vector store, and remove the stashed copy either way.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<()>, ApiError> {
    let field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
        {
            Some(field) if field.name() == Some("file") => break field,
            Some(_) => continue,
            None => return Err(ApiError::bad_request("Missing file field")),
        }
    };

    // Strip any path components a client may smuggle into the filename.
    let file_name = field
        .file_name()
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("upload-{}", Uuid::new_v4().simple()));

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;

    let path = state.upload_dir.join(&file_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;
    info!(file = %file_name, bytes = bytes.len(), "stored upload");

    let result = state.pipeline.ingest_with_retry(&path).await;

    // The stashed copy is temporary regardless of the ingest outcome.
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(path = %path.display(), error = %e, "failed to remove uploaded file");
    }

    result?;
    Ok(ApiResponse::create(
        axum::http::StatusCode::OK,
        None,
        Some("Embeddings successfully created."),
    ))
}
