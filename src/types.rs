//! Core types for reel-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Reel shortcode: the per-request identifier naming both artifact directories
///
/// Only constructed through [`Shortcode::parse`], which admits nothing but
/// `[A-Za-z0-9_-]`, so a shortcode is always a single safe path component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Shortcode(String);

impl Shortcode {
    /// Validate a raw shortcode
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    /// Borrow the shortcode as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for Shortcode {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl std::fmt::Display for Shortcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a cleanup task
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct CleanupTaskId(pub u64);

impl std::fmt::Display for CleanupTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a cleanup task
///
/// There is no failure state: deletion errors are logged and the task still
/// moves to `Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CleanupState {
    /// Accepted, waiting for a worker
    Scheduled,
    /// Picked up by a worker, waiting for the delay to elapse
    Sleeping,
    /// Removing directories
    Deleting,
    /// Finished (successfully or not)
    Done,
}

/// Result of a successful fetch
#[derive(Clone, Debug)]
pub struct FetchedMedia {
    /// Working directory the fetcher populated
    pub working_dir: PathBuf,
}

/// Artifacts placed in the public directory for one shortcode
#[derive(Clone, Debug)]
pub struct StagedArtifacts {
    /// `<public-root>/<shortcode>`
    pub public_dir: PathBuf,
    /// `<public-root>/<shortcode>/<shortcode>.<ext>`
    pub video_path: PathBuf,
    /// `<public-root>/<shortcode>/audio.mp3`
    pub audio_path: PathBuf,
    /// Public URL of the video
    pub video_url: String,
    /// Public URL of the audio
    pub audio_url: String,
}

/// Successful response of `GET /download/reel`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ReelResponse {
    /// Always "success"
    pub status: String,
    /// Caption with newlines folded to spaces
    pub caption: String,
    /// Hashtags found in the caption, in order of appearance
    pub hashtags: Vec<String>,
    /// Download URL of the video
    pub video_download_url: String,
    /// Download URL of the extracted MP3
    pub mp3_download_url: String,
    /// When both files become eligible for deletion
    pub expires_at: DateTime<Utc>,
}

/// Which collaborators the service runs with
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Media fetcher in use ("instaloader", or "unavailable" when not installed)
    pub fetcher: String,
    /// Audio transcoder in use ("ffmpeg", or "unavailable" when not installed)
    pub transcoder: String,
    /// Proxy strategy ("direct", "static" or "tor")
    pub proxy: String,
    /// Whether reels can currently be downloaded end to end
    pub can_download: bool,
}

/// Event emitted during a reel's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Media retrieved into the working directory
    Fetched {
        /// Reel shortcode
        shortcode: Shortcode,
    },

    /// Video and audio placed in the public directory
    Staged {
        /// Reel shortcode
        shortcode: Shortcode,
    },

    /// Deletion of both directories was scheduled
    CleanupScheduled {
        /// Task identity
        id: CleanupTaskId,
        /// Reel shortcode
        shortcode: Shortcode,
        /// When deletion becomes due
        due_at: DateTime<Utc>,
    },

    /// A worker started deleting
    CleanupStarted {
        /// Task identity
        id: CleanupTaskId,
    },

    /// The task finished; `removed` counts directories that existed and were deleted
    CleanupCompleted {
        /// Task identity
        id: CleanupTaskId,
        /// Number of directories removed
        removed: usize,
    },

    /// Service is shutting down
    Shutdown,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcode_accepts_instagram_alphabet() {
        for raw in ["ABC123", "C9x_-aZ", "a"] {
            assert_eq!(Shortcode::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn shortcode_rejects_path_like_input() {
        for raw in ["", "..", "a/b", "a.b", "a b", "a%2F"] {
            assert!(Shortcode::parse(raw).is_none(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = Event::CleanupCompleted {
            id: CleanupTaskId(7),
            removed: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "cleanup_completed");
        assert_eq!(json["id"], 7);
        assert_eq!(json["removed"], 2);
    }

    #[test]
    fn cleanup_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(CleanupState::Sleeping).unwrap(),
            "sleeping"
        );
    }
}
