//! Compression job definitions.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::preset::{ImageFormat, Preset};

/// Length of generated job and file ids.
pub const SHORT_ID_LEN: usize = 8;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new short random job ID.
    pub fn new() -> Self {
        Self(short_id())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// First eight hex characters of a random v4 UUID.
pub fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..SHORT_ID_LEN].to_string()
}

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Uploaded, waiting for a processing slot
    #[default]
    Pending,
    /// Compression in progress
    Processing,
    /// Output file is ready
    Completed,
    /// Compression failed
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single uploaded file moving through compression.
#[derive(Debug, Clone)]
pub struct CompressionJob {
    pub id: JobId,
    /// Filename as supplied by the client
    pub original_filename: String,
    /// Where the upload was stored
    pub original_path: PathBuf,
    pub preset: Preset,
    pub image_format: ImageFormat,
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub compressed_path: Option<PathBuf>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompressionJob {
    /// Create a pending job for a stored upload.
    pub fn new(
        original_filename: impl Into<String>,
        original_path: impl Into<PathBuf>,
        original_size: u64,
        preset: Preset,
        image_format: ImageFormat,
    ) -> Self {
        Self {
            id: JobId::new(),
            original_filename: original_filename.into(),
            original_path: original_path.into(),
            preset,
            image_format,
            status: JobStatus::Pending,
            progress: 0,
            compressed_path: None,
            original_size,
            compressed_size: 0,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Move to processing at the given progress.
    pub fn start_processing(&mut self, progress: u8) {
        self.status = JobStatus::Processing;
        self.set_progress(progress);
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    /// Mark job as completed with its output file.
    pub fn complete(&mut self, compressed_path: impl Into<PathBuf>, compressed_size: u64) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.compressed_path = Some(compressed_path.into());
        self.compressed_size = compressed_size;
        self.completed_at = Some(Utc::now());
    }

    /// Mark job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
    }

    /// Size reduction in percent, rounded to one decimal.
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.original_size > 0 && self.compressed_size > 0 {
            let ratio = (1.0 - self.compressed_size as f64 / self.original_size as f64) * 100.0;
            Some((ratio * 10.0).round() / 10.0)
        } else {
            None
        }
    }

    pub fn is_download_ready(&self) -> bool {
        self.status == JobStatus::Completed && self.compressed_path.is_some()
    }

    /// File name of the compressed output.
    pub fn output_filename(&self) -> Option<String> {
        self.compressed_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// JSON view returned by the API.
    pub fn view(&self) -> JobView {
        JobView {
            id: self.id.clone(),
            original_filename: self.original_filename.clone(),
            preset: self.preset,
            image_format: self.image_format,
            status: self.status,
            progress: self.progress,
            original_size: self.original_size,
            compressed_size: self.compressed_size,
            compression_ratio: self.compression_ratio(),
            error_message: self.error_message.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
            download_ready: self.is_download_ready(),
            output_filename: self.output_filename(),
        }
    }
}

/// Serialized job as seen by API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobView {
    pub id: JobId,
    pub original_filename: String,
    pub preset: Preset,
    pub image_format: ImageFormat,
    pub status: JobStatus,
    pub progress: u8,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_ratio: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub download_ready: bool,
    pub output_filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> CompressionJob {
        CompressionJob::new(
            "holiday.jpg",
            "/tmp/up/abcd1234_holiday.jpg",
            1000,
            Preset::Facebook,
            ImageFormat::Jpg,
        )
    }

    #[test]
    fn test_short_ids() {
        let id = JobId::new();
        assert_eq!(id.as_str().len(), SHORT_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(JobId::new(), id);
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(!job.is_download_ready());
        assert_eq!(job.compression_ratio(), None);
    }

    #[test]
    fn test_lifecycle() {
        let mut job = job();
        job.start_processing(10);
        assert_eq!(job.status, JobStatus::Processing);
        job.set_progress(250);
        assert_eq!(job.progress, 100);

        job.complete("/tmp/down/compressed_holiday.jpg", 400);
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(job.is_download_ready());
        assert_eq!(
            job.output_filename().as_deref(),
            Some("compressed_holiday.jpg")
        );
        assert_eq!(job.compression_ratio(), Some(60.0));
    }

    #[test]
    fn test_ratio_rounding() {
        let mut job = job();
        job.original_size = 3;
        job.compressed_size = 2;
        assert_eq!(job.compression_ratio(), Some(33.3));

        // Larger output yields a negative reduction
        job.compressed_size = 4;
        assert_eq!(job.compression_ratio(), Some(-33.3));
    }

    #[test]
    fn test_fail_keeps_terminal() {
        let mut job = job();
        job.fail("boom");
        assert!(job.status.is_terminal());
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        assert!(!job.is_download_ready());
    }

    #[test]
    fn test_view_serialization() {
        let mut job = job();
        job.complete("/tmp/down/compressed_holiday.jpg", 500);
        let value = serde_json::to_value(job.view()).unwrap();

        assert_eq!(value["status"], "completed");
        assert_eq!(value["preset"], "facebook");
        assert_eq!(value["image_format"], "jpg");
        assert_eq!(value["download_ready"], true);
        assert_eq!(value["compression_ratio"], 50.0);
        assert_eq!(value["output_filename"], "compressed_holiday.jpg");
        assert!(value["created_at"].is_string());
        assert!(value["error_message"].is_null());
    }

    #[test]
    fn test_view_schema_lists_fields() {
        let schema = schemars::schema_for!(JobView);
        let json = serde_json::to_value(&schema).unwrap();
        let props = json["properties"].as_object().unwrap();
        assert!(props.contains_key("download_ready"));
        assert!(props.contains_key("compression_ratio"));
    }
}
