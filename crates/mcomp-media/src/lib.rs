//! FFmpeg CLI wrapper and image pipeline for media compression.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeouts
//! - Preset-driven video and animated GIF re-encoding
//! - In-process still image compression (EXIF orientation, alpha flattening, resize)
//! - JPEG thumbnails for images and videos
//! - Host capability detection (FFmpeg, HEIC)

pub mod capabilities;
pub mod command;
pub mod compressor;
pub mod error;
pub mod heic;
pub mod still_image;
pub mod thumbnail;
pub mod video;

pub use capabilities::{check_ffmpeg_available, check_heic_support, MediaCapabilities};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use compressor::{compress_file, compressed_output_path};
pub use error::{MediaError, MediaResult};
pub use still_image::compress_image;
pub use thumbnail::generate_thumbnail;
pub use video::{compress_gif, compress_video};
