//! Thumbnail generation.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;

use mcomp_models::{dotted_extension, is_heic, MediaKind};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::heic::decode_heic;
use crate::still_image::{fit_within, flatten_to_rgb, load_oriented, run_blocking};

/// Longest side of a thumbnail in pixels
pub const THUMBNAIL_SIZE: u32 = 200;
/// JPEG quality of thumbnails
pub const THUMBNAIL_QUALITY: u8 = 70;
/// Where video thumbnails are captured
pub const VIDEO_THUMBNAIL_TIMESTAMP: &str = "00:00:01";

/// Generate a JPEG thumbnail for any supported file.
pub async fn generate_thumbnail(
    path: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<Vec<u8>> {
    let path = path.as_ref();
    match MediaKind::from_path(path) {
        Some(MediaKind::Image) if is_heic(path) => {
            let scratch = tempfile::tempdir()?;
            let decoded = decode_heic(path, scratch.path(), runner).await?;
            image_thumbnail(&decoded).await
        }
        Some(MediaKind::Image) | Some(MediaKind::Gif) => image_thumbnail(path).await,
        Some(MediaKind::Video) => video_thumbnail(path, runner).await,
        None => Err(MediaError::UnsupportedFormat(dotted_extension(path).unwrap_or_default())),
    }
}

/// Downscaled JPEG of a still image (first frame for GIFs).
pub async fn image_thumbnail(path: &Path) -> MediaResult<Vec<u8>> {
    let path = path.to_path_buf();
    run_blocking(move || {
        let img = fit_within(flatten_to_rgb(load_oriented(&path)?), THUMBNAIL_SIZE);
        let mut buf = Vec::new();
        img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_QUALITY))?;
        Ok(buf)
    })
    .await
}

/// JPEG frame captured one second into a video, 200px wide.
pub async fn video_thumbnail(path: &Path, runner: &FfmpegRunner) -> MediaResult<Vec<u8>> {
    let scratch = tempfile::tempdir()?;
    let output = scratch.path().join("thumbnail.jpg");

    let cmd = FfmpegCommand::new(path, &output)
        .frame_at(VIDEO_THUMBNAIL_TIMESTAMP)
        .video_filter(format!("scale={}:-1", THUMBNAIL_SIZE));
    runner.run(&cmd).await?;

    match tokio::fs::read(&output).await {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(MediaError::internal("Failed to generate video thumbnail")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(MediaError::internal("Failed to generate video thumbnail"))
        }
        Err(e) => Err(e.into()),
    }
}
