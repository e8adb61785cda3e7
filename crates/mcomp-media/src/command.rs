//! FFmpeg invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// A single `ffmpeg` run: `ffmpeg -y -v error -i <input> [options] <output>`.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    options: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            options: Vec::new(),
        }
    }

    /// Append an output option and its value.
    pub fn option(mut self, name: &str, value: impl ToString) -> Self {
        self.options.push(name.to_string());
        self.options.push(value.to_string());
        self
    }

    /// Append pre-split output arguments verbatim.
    pub fn raw_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn video_codec(self, codec: &str) -> Self {
        self.option("-c:v", codec)
    }

    /// x264/x265 rate control: constant quality plus speed preset.
    pub fn crf(self, crf: u8, preset: &str) -> Self {
        self.option("-crf", crf).option("-preset", preset)
    }

    pub fn audio(self, codec: &str, bitrate: &str) -> Self {
        self.option("-c:a", codec).option("-b:a", bitrate)
    }

    pub fn video_filter(self, filter: impl ToString) -> Self {
        self.option("-vf", filter)
    }

    /// Write only the first frame.
    pub fn first_frame(self) -> Self {
        self.option("-frames:v", 1)
    }

    /// Write the frame at `timestamp` (`HH:MM:SS`). Seeks after decoding, so it is frame accurate.
    pub fn frame_at(self, timestamp: &str) -> Self {
        self.option("-ss", timestamp).first_frame()
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Full argument list, excluding the program name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.options.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Executes [`FfmpegCommand`]s, optionally killing runs that exceed a timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    /// Run to completion. A non-zero exit carries FFmpeg's stderr.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let ffmpeg = check_ffmpeg()?;
        let args = cmd.to_args();
        debug!("ffmpeg {}", args.join(" "));

        // kill_on_drop reaps the process when the timeout drops the future
        let child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(output = %cmd.output_path().display(), "FFmpeg timed out, killed");
                    return Err(MediaError::Timeout(limit.as_secs()));
                }
            },
            None => child.wait_with_output().await?,
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(exit_code = ?output.status.code(), "FFmpeg failed: {}", stderr);

        let message = match last_line(&stderr) {
            Some(line) => format!("FFmpeg exited with {}: {}", output.status, line),
            None => format!("FFmpeg exited with {}", output.status),
        };
        Err(MediaError::ffmpeg_failed(
            message,
            (!stderr.is_empty()).then_some(stderr),
            output.status.code(),
        ))
    }
}

fn last_line(s: &str) -> Option<&str> {
    s.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Locate `ffmpeg` on `PATH`.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
