//! FFmpeg-backed video and animated GIF compression.

use std::path::{Path, PathBuf};

use tracing::info;

use mcomp_models::preset::{AUDIO_BITRATE, AUDIO_CODEC};
use mcomp_models::Preset;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::compressor::compressed_output_path;
use crate::error::MediaResult;

/// Container of every compressed video
pub const VIDEO_EXTENSION: &str = "mp4";
pub const GIF_EXTENSION: &str = "gif";

/// Palette-optimised GIF filter: 15 fps, at most 480px wide, 128 colours.
pub const GIF_FILTER: &str = concat!(
    "fps=15,scale='min(480,iw)':-1:flags=lanczos,split[s0][s1];",
    "[s0]palettegen=max_colors=128[p];[s1][p]paletteuse=dither=bayer"
);

/// Build the re-encode command for a video under a preset.
pub fn video_command(input: &Path, output: &Path, preset: Preset) -> FfmpegCommand {
    let profile = preset.video();
    FfmpegCommand::new(input, output)
        .video_codec(profile.codec)
        .crf(profile.crf, profile.preset)
        .audio(AUDIO_CODEC, AUDIO_BITRATE)
        .raw_args(profile.extra_args.iter().copied())
}

/// Build the palette re-encode command for an animated GIF.
pub fn gif_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output).video_filter(GIF_FILTER)
}

/// Re-encode a video into `compressed_<stem>.mp4` inside `output_dir`.
pub async fn compress_video(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    preset: Preset,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output = compressed_output_path(input, output_dir.as_ref(), VIDEO_EXTENSION);

    info!(preset = %preset, "Compressing video: {}", display_name(input));
    runner.run(&video_command(input, &output, preset)).await?;
    info!("Video compressed: {}", display_name(&output));

    Ok(output)
}

/// Re-encode an animated GIF into `compressed_<stem>.gif` inside `output_dir`.
pub async fn compress_gif(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output = compressed_output_path(input, output_dir.as_ref(), GIF_EXTENSION);

    info!("Compressing GIF: {}", display_name(input));
    runner.run(&gif_command(input, &output)).await?;
    info!("GIF compressed: {}", display_name(&output));

    Ok(output)
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined_args(preset: Preset) -> String {
        video_command(Path::new("in.mov"), Path::new("out.mp4"), preset)
            .to_args()
            .join(" ")
    }

    #[test]
    fn test_facebook_video_args() {
        let joined = joined_args(Preset::Facebook);
        assert!(joined.contains("-c:v libx264 -crf 23 -preset medium -c:a aac -b:a 128k"));
        assert!(joined.contains("-maxrate 1638k -bufsize 3276k -movflags +faststart"));
        assert!(joined.ends_with(" out.mp4"));
    }

    #[test]
    fn test_hevc_video_args() {
        let joined = joined_args(Preset::Aggressive);
        assert!(joined.contains("-c:v libx265 -crf 30 -preset fast"));
        assert!(joined.contains("-tag:v hvc1"));
    }

    #[test]
    fn test_gif_args() {
        let args = gif_command(Path::new("a.gif"), Path::new("b.gif")).to_args();
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf + 1].contains("palettegen=max_colors=128"));
        assert!(args[vf + 1].starts_with("fps=15"));
    }
}
