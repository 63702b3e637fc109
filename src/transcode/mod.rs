//! Audio extraction
//!
//! [`AudioTranscoder`] turns a staged video into an audio file. The production
//! implementation is [`FfmpegTranscoder`]; [`UnavailableTranscoder`] stands in
//! when ffmpeg is not installed.

mod ffmpeg;

pub use ffmpeg::FfmpegTranscoder;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Trait for extracting an audio track from a video file
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Extract the audio of `video` into a new file and return its path
    ///
    /// The audio is written next to the video; the caller decides where it ends
    /// up. Failures are reported as [`crate::error::TranscodeError`] values.
    async fn transcode(&self, video: &Path) -> crate::Result<PathBuf>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Transcoder used when no ffmpeg binary is available
pub struct UnavailableTranscoder;

#[async_trait]
impl AudioTranscoder for UnavailableTranscoder {
    async fn transcode(&self, _video: &Path) -> crate::Result<PathBuf> {
        Err(crate::Error::NotSupported(
            "audio extraction requires the ffmpeg binary. \
             Configure ffmpeg_path in config or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
