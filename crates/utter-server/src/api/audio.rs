//! Artifact download endpoint.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Stream a stored artifact back to the client.
///
/// The handle held across the read pins the artifact against eviction.
pub async fn download(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let handle = state
        .service
        .fetch(&artifact_id)
        .ok_or_else(|| ApiError::not_found(format!("no artifact '{}'", artifact_id)))?;

    let bytes = state.service.read_artifact(&handle).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, "audio/wav")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.wav\"", artifact_id),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(e.to_string()))
}
