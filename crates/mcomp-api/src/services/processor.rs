//! Background compression of uploaded files.

use std::path::PathBuf;
use std::time::Instant;

use tracing::warn;

use mcomp_media::{compress_file, MediaError};
use mcomp_models::{CompressionJob, JobId, MediaKind};

use crate::logging::JobLogger;
use crate::metrics;
use crate::state::AppState;

/// Progress reported once the job leaves the queue.
pub const PROGRESS_STARTED: u8 = 10;
/// Progress reported right before the encoder runs.
pub const PROGRESS_ENCODING: u8 = 30;
/// Progress reported once the encoder has produced output.
pub const PROGRESS_FINALIZING: u8 = 90;

type Outcome = Result<(PathBuf, u64), MediaError>;

/// Spawn processing for a freshly created job.
pub fn spawn_compression(state: AppState, job_id: JobId) {
    tokio::spawn(async move {
        process_compression_job(&state, &job_id).await;
    });
}

/// Compress one job, recording the outcome on the job itself.
pub async fn process_compression_job(state: &AppState, job_id: &JobId) {
    let logger = JobLogger::new(job_id, "compress");

    // Closed only on shutdown, in which case the job stays pending
    let Ok(_permit) = state.compression_slots.acquire().await else {
        return;
    };

    let Some(job) = state.jobs.get_job(job_id).await else {
        logger.log_progress("job removed before processing started");
        return;
    };

    let kind = MediaKind::from_path(&job.original_path)
        .map(|k| k.as_str())
        .unwrap_or("unknown");
    logger.log_start(&format!(
        "{} ({}, preset={}, format={})",
        job.original_filename, kind, job.preset, job.image_format
    ));

    state
        .jobs
        .update_job(job_id, |j| j.start_processing(PROGRESS_STARTED))
        .await;

    let started = Instant::now();
    let outcome = run_compression(state, &job).await;
    metrics::record_compression_duration(kind, started.elapsed().as_secs_f64());

    finish_job(state, &job, kind, outcome).await;
}

async fn run_compression(state: &AppState, job: &CompressionJob) -> Outcome {
    state
        .jobs
        .update_job(&job.id, |j| j.set_progress(PROGRESS_ENCODING))
        .await;

    let output = compress_file(
        &job.original_path,
        &state.config.download_dir,
        job.preset,
        job.image_format,
        &state.runner,
    )
    .await?;

    let metadata = tokio::fs::metadata(&output)
        .await
        .map_err(|_| MediaError::NoOutput)?;

    Ok((output, metadata.len()))
}

/// Store the outcome on the job.
///
/// A job deleted while its encode ran is not recreated. Its output is removed
/// instead, since no download can reach it any more.
async fn finish_job(state: &AppState, job: &CompressionJob, kind: &str, outcome: Outcome) {
    let logger = JobLogger::new(&job.id, "compress");

    match outcome {
        Ok((path, size)) => {
            let found = state
                .jobs
                .update_job(&job.id, |j| {
                    j.set_progress(PROGRESS_FINALIZING);
                    j.complete(&path, size);
                })
                .await;

            if !found {
                logger.log_progress("job removed while compressing, output discarded");
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(
                        "Failed to remove output of deleted job {}: {}",
                        path.display(),
                        e
                    );
                }
                return;
            }

            metrics::record_job_completed(kind, job.original_size, size);
            logger.log_completion(&format!("{} -> {} bytes", job.original_size, size));
        }
        Err(e) => {
            let message = e.to_string();
            logger.log_error(&message);
            metrics::record_job_failed(kind);
            state.jobs.update_job(&job.id, |j| j.fail(message)).await;
        }
    }
}
