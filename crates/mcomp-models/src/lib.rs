//! Shared data models for the media compressor.
//!
//! This crate provides Serde-serializable types for:
//! - Compression jobs and their JSON view
//! - Compression presets and image output formats
//! - Media kind classification by file extension

pub mod error;
pub mod job;
pub mod media_kind;
pub mod preset;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use job::{CompressionJob, JobId, JobStatus, JobView};
pub use media_kind::{dotted_extension, is_allowed_upload, is_heic, MediaKind};
pub use preset::{ImageFormat, ImagePreset, Preset, VideoPreset};
