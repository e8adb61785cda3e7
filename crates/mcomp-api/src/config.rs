//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const MB: u64 = 1024 * 1024;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Environment (development/production)
    pub environment: String,
    /// Where uploads are stored
    pub upload_dir: PathBuf,
    /// Where compressed outputs are written
    pub download_dir: PathBuf,
    /// Max upload size in megabytes
    pub max_upload_size_mb: u64,
    /// Jobs compressed concurrently
    pub max_concurrent_jobs: usize,
    /// Kill FFmpeg after this many seconds
    pub ffmpeg_timeout_secs: u64,
    /// Jobs older than this are removed with their files
    pub job_max_age: Duration,
    /// How often old jobs are swept
    pub cleanup_interval: Duration,
    /// Whether the sweeper runs at all
    pub cleanup_enabled: bool,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second per client IP
    pub rate_limit_rps: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            environment: "development".to_string(),
            upload_dir: PathBuf::from("./data/uploads"),
            download_dir: PathBuf::from("./data/downloads"),
            max_upload_size_mb: 500,
            max_concurrent_jobs: 2,
            ffmpeg_timeout_secs: 1800,
            job_max_age: Duration::from_secs(24 * 3600),
            cleanup_interval: Duration::from_secs(600),
            cleanup_enabled: true,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 20,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_string(&["API_HOST", "HOST"]).unwrap_or(defaults.host),
            port: env_parse(&["API_PORT", "PORT"]).unwrap_or(defaults.port),
            environment: env_string(&["ENVIRONMENT"]).unwrap_or(defaults.environment),
            upload_dir: env_string(&["UPLOAD_DIR"])
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            download_dir: env_string(&["DOWNLOAD_DIR"])
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            max_upload_size_mb: env_parse(&["MAX_UPLOAD_SIZE_MB", "MAX_FILE_SIZE_MB"])
                .unwrap_or(defaults.max_upload_size_mb),
            max_concurrent_jobs: env_parse::<usize>(&["MAX_CONCURRENT_JOBS"])
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            ffmpeg_timeout_secs: env_parse(&["FFMPEG_TIMEOUT_SECS"])
                .unwrap_or(defaults.ffmpeg_timeout_secs),
            job_max_age: env_parse::<u64>(&["JOB_MAX_AGE_HOURS"])
                .map(hours)
                .unwrap_or(defaults.job_max_age),
            cleanup_interval: env_parse::<u64>(&["CLEANUP_INTERVAL_SECS"])
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            cleanup_enabled: env_string(&["ENABLE_JOB_CLEANUP"])
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.cleanup_enabled),
            cors_origins: env_string(&["CORS_ORIGINS"])
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse(&["RATE_LIMIT_RPS"]).unwrap_or(defaults.rate_limit_rps),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        is_production_env(&self.environment)
    }

    /// Max upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(MB)
    }

    /// Request body limit: the upload maximum plus room for multipart framing.
    pub fn max_body_bytes(&self) -> usize {
        usize::try_from(self.max_upload_bytes().saturating_add(MB)).unwrap_or(usize::MAX)
    }

    /// Create upload and download directories.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.download_dir).await
    }
}

/// Whether an `ENVIRONMENT` value names production, ignoring case.
pub fn is_production_env(environment: &str) -> bool {
    environment.trim().eq_ignore_ascii_case("production")
}

fn hours(h: u64) -> Duration {
    Duration::from_secs(h.saturating_mul(3600))
}

/// First set, non-empty variable among `keys`.
fn env_string(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(keys: &[&str]) -> Option<T> {
    env_string(keys).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_upload_bytes(), 500 * 1024 * 1024);
        assert!(config.max_body_bytes() as u64 > config.max_upload_bytes());
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_detection() {
        let config = ApiConfig {
            environment: "Production".to_string(),
            ..Default::default()
        };
        assert!(config.is_production());
    }

    #[test]
    fn test_production_env_values() {
        assert!(is_production_env("production"));
        assert!(is_production_env("PRODUCTION"));
        assert!(is_production_env(" Production\n"));
        assert!(!is_production_env("prod"));
        assert!(!is_production_env(""));
    }

    #[test]
    fn test_huge_sizes_saturate() {
        let config = ApiConfig {
            max_upload_size_mb: u64::MAX / 1024,
            ..Default::default()
        };
        assert_eq!(config.max_upload_bytes(), u64::MAX);
        assert_eq!(config.max_body_bytes(), usize::MAX);

        assert_eq!(hours(u64::MAX), Duration::from_secs(u64::MAX));
        assert_eq!(hours(24), Duration::from_secs(86_400));
    }
}
