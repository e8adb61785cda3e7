//! Application state.

use std::sync::Arc;

use tokio::sync::Semaphore;

use mcomp_jobs::JobManager;
use mcomp_media::{FfmpegRunner, MediaCapabilities};

use crate::config::ApiConfig;
use crate::middleware::ClientRateLimiter;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub jobs: JobManager,
    /// Detected once at startup
    pub capabilities: MediaCapabilities,
    pub runner: FfmpegRunner,
    /// Bounds how many jobs compress at the same time
    pub compression_slots: Arc<Semaphore>,
    pub rate_limiter: ClientRateLimiter,
}

impl AppState {
    pub fn new(config: ApiConfig, capabilities: MediaCapabilities) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout_secs);
        let compression_slots = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let rate_limiter = ClientRateLimiter::new(config.rate_limit_rps);

        Self {
            config: Arc::new(config),
            jobs: JobManager::new(),
            capabilities,
            runner,
            compression_slots,
            rate_limiter,
        }
    }
}
