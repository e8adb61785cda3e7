//! Job status and management handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use mcomp_jobs::remove_job_files;
use mcomp_models::{JobId, JobView};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearJobsResponse {
    pub message: String,
    pub cleared: usize,
}

/// Get a single job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let job = state
        .jobs
        .get_job(&JobId::from_string(job_id))
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(job.view()))
}

/// Delete a job along with its upload and output.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let job = state
        .jobs
        .delete_job(&JobId::from_string(job_id))
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    remove_job_files(&job).await;
    info!(job_id = %job.id, "Job deleted");

    Ok(Json(MessageResponse {
        message: "Job deleted".to_string(),
    }))
}

/// List all jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.jobs.list_jobs().await,
    })
}

/// Delete every job and its files.
pub async fn clear_jobs(State(state): State<AppState>) -> Json<ClearJobsResponse> {
    let cleared = state.jobs.clear_all().await;
    for job in &cleared {
        remove_job_files(job).await;
    }
    info!(cleared = cleared.len(), "Cleared all jobs");

    Json(ClearJobsResponse {
        message: format!("Cleared {} jobs", cleared.len()),
        cleared: cleared.len(),
    })
}
