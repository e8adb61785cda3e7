//! Periodic removal of expired jobs and their files.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use mcomp_jobs::JobManager;

use crate::config::ApiConfig;
use crate::metrics;

/// Sweeps jobs older than the configured maximum age.
pub struct JobJanitor {
    jobs: JobManager,
    max_age: Duration,
    interval: Duration,
    enabled: bool,
}

impl JobJanitor {
    pub fn new(jobs: JobManager, config: &ApiConfig) -> Self {
        Self {
            jobs,
            max_age: config.job_max_age,
            interval: config.cleanup_interval,
            enabled: config.cleanup_enabled,
        }
    }

    /// Run until the task is dropped. Returns immediately when disabled.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Job cleanup is disabled");
            return;
        }

        info!(
            "Starting job janitor (interval: {:?}, max age: {:?})",
            self.interval, self.max_age
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// Run a single cleanup pass, returning how many jobs were removed.
    pub async fn sweep(&self) -> usize {
        let removed = self.jobs.cleanup_old_jobs(self.max_age).await;
        if removed > 0 {
            info!(removed, "Removed expired jobs");
            metrics::record_jobs_cleaned(removed);
        } else {
            debug!("No expired jobs");
        }
        removed
    }
}
