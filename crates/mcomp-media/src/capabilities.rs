//! Runtime capability detection.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::command::check_ffmpeg;

/// What the host can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaCapabilities {
    pub ffmpeg_available: bool,
    pub heic_support: bool,
}

impl MediaCapabilities {
    /// Inspect the host. Spawns `ffmpeg` synchronously, so call once at startup.
    pub fn detect() -> Self {
        let ffmpeg_available = check_ffmpeg_available();
        let heic_support = ffmpeg_available && check_heic_support();
        Self {
            ffmpeg_available,
            heic_support,
        }
    }
}

/// Whether `ffmpeg -version` runs successfully.
pub fn check_ffmpeg_available() -> bool {
    let Ok(ffmpeg) = check_ffmpeg() else {
        return false;
    };
    Command::new(ffmpeg)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Whether FFmpeg can decode HEVC, which HEIC/HEIF stills are encoded with.
pub fn check_heic_support() -> bool {
    let Ok(ffmpeg) = check_ffmpeg() else {
        return false;
    };
    match Command::new(ffmpeg)
        .args(["-hide_banner", "-decoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    {
        Ok(output) if output.status.success() => {
            let listing = String::from_utf8_lossy(&output.stdout);
            has_hevc_decoder(&listing)
        }
        Ok(output) => {
            debug!("ffmpeg -decoders exited with {}", output.status);
            false
        }
        Err(e) => {
            debug!("ffmpeg -decoders failed: {}", e);
            false
        }
    }
}

/// Decoder listing lines look like ` V....D hevc   HEVC (High Efficiency Video Coding)`.
fn has_hevc_decoder(listing: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|name| name == "hevc")
}
