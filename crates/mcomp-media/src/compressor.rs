//! Media-kind dispatch for compression.

use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use mcomp_models::{dotted_extension, ImageFormat, MediaKind, Preset};

use crate::command::FfmpegRunner;
use crate::error::{MediaError, MediaResult};
use crate::still_image::compress_image;
use crate::video::{compress_gif, compress_video, GIF_EXTENSION, VIDEO_EXTENSION};

/// Output path `<output_dir>/compressed_<stem>.<extension>`.
pub fn compressed_output_path(input: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("compressed_{}.{}", stem, extension))
}

/// Extension of the compressed output for a media kind.
pub fn output_extension(kind: MediaKind, image_format: ImageFormat) -> &'static str {
    match kind {
        MediaKind::Video => VIDEO_EXTENSION,
        MediaKind::Gif => GIF_EXTENSION,
        MediaKind::Image => image_format.extension(),
    }
}

/// Compress any supported file according to its media kind.
///
/// Videos become MP4, GIFs stay GIF, still images are encoded as `image_format`.
/// When compression fails, whatever the encoder already wrote is deleted.
pub async fn compress_file(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    preset: Preset,
    image_format: ImageFormat,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let Some(kind) = MediaKind::from_path(input) else {
        let ext = dotted_extension(input).unwrap_or_default();
        error!("Unsupported file type: {}", ext);
        return Err(MediaError::UnsupportedFormat(ext));
    };

    let result = match kind {
        MediaKind::Video => compress_video(input, output_dir, preset, runner).await,
        MediaKind::Gif => compress_gif(input, output_dir, runner).await,
        MediaKind::Image => compress_image(input, output_dir, preset, image_format, runner).await,
    };

    if result.is_err() {
        let extension = output_extension(kind, image_format);
        let output = compressed_output_path(input, output_dir, extension);
        discard_partial_output(&output).await;
    }
    result
}

async fn discard_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!("Removed partial output {}", output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", output.display(), e),
    }
}
