//! Transcoder backed by the external `ffmpeg` binary

use super::AudioTranscoder;
use crate::error::TranscodeError;
use crate::utils::{ToolRunError, run_tool, stderr_tail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Extracts MP3 audio with `ffmpeg`
///
/// The audio is written beside the video as `<video-stem>.mp3`.
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
    bitrate: String,
    timeout: Option<Duration>,
}

impl FfmpegTranscoder {
    /// Create a transcoder with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            bitrate: "192k".to_string(),
            timeout: None,
        }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Set the MP3 bitrate (ffmpeg syntax, e.g. "128k")
    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    /// Kill the child process if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, video: &Path, audio: &Path) -> Command {
        let mut command = Command::new(&self.binary_path);
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-nostdin")
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-vn")
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-b:a")
            .arg(&self.bitrate)
            .arg(audio);
        command
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn transcode(&self, video: &Path) -> crate::Result<PathBuf> {
        let audio = video.with_extension("mp3");

        tracing::debug!(?video, ?audio, "extracting audio");

        let output = run_tool(self.command(video, &audio), self.timeout)
            .await
            .map_err(|e| match e {
                ToolRunError::Spawn(e) => TranscodeError::ToolFailed {
                    video: video.to_path_buf(),
                    reason: format!("failed to execute ffmpeg: {e}"),
                },
                ToolRunError::TimedOut(limit) => TranscodeError::Timeout {
                    video: video.to_path_buf(),
                    seconds: limit.as_secs(),
                },
            })?;

        if !output.status.success() {
            return Err(TranscodeError::ToolFailed {
                video: video.to_path_buf(),
                reason: stderr_tail(&output),
            }
            .into());
        }

        if !tokio::fs::try_exists(&audio).await.unwrap_or(false) {
            return Err(TranscodeError::OutputMissing {
                video: video.to_path_buf(),
                expected: audio,
            }
            .into());
        }

        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
