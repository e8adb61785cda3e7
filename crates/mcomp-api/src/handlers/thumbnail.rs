//! Thumbnail handler.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use mcomp_media::{generate_thumbnail, MediaError};
use mcomp_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 200px JPEG preview of a job's original upload.
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job = state
        .jobs
        .get_job(&JobId::from_string(job_id))
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let exists = tokio::fs::try_exists(&job.original_path).await;
    if !exists.unwrap_or(false) {
        return Err(ApiError::not_found("Original file not found"));
    }

    let bytes = generate_thumbnail(&job.original_path, &state.runner)
        .await
        .map_err(|e| match e {
            MediaError::UnsupportedFormat(ext) => {
                ApiError::bad_request(format!("Unsupported file type: {}", ext))
            }
            other => ApiError::internal(format!("Thumbnail generation failed: {}", other)),
        })?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}
