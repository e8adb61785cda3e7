//! HEIC/HEIF pre-decoding.
//!
//! The `image` crate has no HEIF decoder, so HEIC stills are first turned
//! into a lossless PNG by FFmpeg and then fed through the normal image path.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Decode `input` into `<scratch_dir>/decoded.png`.
pub async fn decode_heic(
    input: &Path,
    scratch_dir: &Path,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let output = scratch_dir.join("decoded.png");
    debug!("Decoding HEIC {} via FFmpeg", input.display());

    let cmd = FfmpegCommand::new(input, &output).first_frame();
    runner.run(&cmd).await?;

    Ok(output)
}
