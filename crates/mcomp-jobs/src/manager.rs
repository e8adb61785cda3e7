//! Job registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use mcomp_models::{CompressionJob, ImageFormat, JobId, JobView, Preset};

use crate::error::{JobError, JobResult};

/// Shared, cloneable registry of compression jobs.
///
/// Jobs live only in memory; files they reference live on disk and are
/// removed together with the job by the delete/cleanup helpers.
#[derive(Debug, Clone, Default)]
pub struct JobManager {
    jobs: Arc<RwLock<HashMap<JobId, CompressionJob>>>,
}

impl JobManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending job for an upload already written to `original_path`.
    pub async fn create_job(
        &self,
        original_filename: impl Into<String>,
        original_path: impl AsRef<Path>,
        preset: Preset,
        image_format: ImageFormat,
    ) -> JobResult<CompressionJob> {
        let original_path = original_path.as_ref();
        let metadata = tokio::fs::metadata(original_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                JobError::UploadNotFound(original_path.to_path_buf())
            } else {
                JobError::Io(e)
            }
        })?;

        let job = CompressionJob::new(
            original_filename,
            original_path,
            metadata.len(),
            preset,
            image_format,
        );
        debug!(job_id = %job.id, size = job.original_size, "Job created");

        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    /// Snapshot of a job.
    pub async fn get_job(&self, job_id: &JobId) -> Option<CompressionJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Apply `f` to a job. Returns false when the job no longer exists.
    pub async fn update_job<F>(&self, job_id: &JobId, f: F) -> bool
    where
        F: FnOnce(&mut CompressionJob),
    {
        match self.jobs.write().await.get_mut(job_id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// Remove a job from the registry. Files are left untouched.
    pub async fn delete_job(&self, job_id: &JobId) -> Option<CompressionJob> {
        self.jobs.write().await.remove(job_id)
    }

    /// All jobs, newest first.
    pub async fn list_jobs(&self) -> Vec<JobView> {
        let jobs = self.jobs.read().await;
        let mut views: Vec<JobView> = jobs.values().map(CompressionJob::view).collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views
    }

    /// Jobs whose output is ready to download, newest first.
    pub async fn completed_jobs(&self) -> Vec<CompressionJob> {
        let jobs = self.jobs.read().await;
        let mut done: Vec<CompressionJob> = jobs
            .values()
            .filter(|j| j.is_download_ready())
            .cloned()
            .collect();
        done.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        done
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Remove and return every job.
    pub async fn clear_all(&self) -> Vec<CompressionJob> {
        let mut jobs = self.jobs.write().await;
        jobs.drain().map(|(_, job)| job).collect()
    }

    /// Drop jobs older than `max_age` along with their files.
    ///
    /// Returns how many jobs were removed.
    pub async fn cleanup_old_jobs(&self, max_age: Duration) -> usize {
        let cutoff = match chrono::Duration::from_std(max_age) {
            Ok(age) => Utc::now() - age,
            Err(_) => return 0,
        };

        let expired: Vec<CompressionJob> = {
            let mut jobs = self.jobs.write().await;
            let ids: Vec<JobId> = jobs
                .values()
                .filter(|job| job.created_at < cutoff)
                .map(|job| job.id.clone())
                .collect();
            ids.iter().filter_map(|id| jobs.remove(id)).collect()
        };

        for job in &expired {
            remove_job_files(job).await;
        }

        if !expired.is_empty() {
            info!("Cleaned up {} jobs older than {:?}", expired.len(), max_age);
        }
        expired.len()
    }
}

/// Best-effort removal of a job's upload and compressed output.
pub async fn remove_job_files(job: &CompressionJob) {
    remove_if_exists(&job.original_path).await;
    if let Some(path) = &job.compressed_path {
        remove_if_exists(path).await;
    }
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
