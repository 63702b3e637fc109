//! Artifact staging
//!
//! Moves fetched media out of a shortcode's working directory into the public
//! root, triggers audio extraction on the moved video and builds the download
//! URLs under `<public-base-url>/static/<shortcode>/`.
//!
//! Staging never copies: the video leaves the working directory. When audio
//! extraction fails the staged video stays where it is and the caller is
//! expected to schedule cleanup for the public directory anyway.

mod caption;

pub use caption::{DEFAULT_CAPTION, read_caption};

use crate::error::{Error, FetchError, Result};
use crate::transcode::AudioTranscoder;
use crate::types::{Shortcode, StagedArtifacts};
use crate::utils::{first_file_with_extension, move_file};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Video extensions accepted from the fetcher
const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// File name of the staged audio track inside a public directory
pub const AUDIO_FILE_NAME: &str = "audio.mp3";

/// URL path segment under which the public root is served
pub const STATIC_ROUTE: &str = "static";

/// Places artifacts in `<public-root>/<shortcode>/` and addresses them
pub struct ArtifactStager {
    public_root: PathBuf,
    base_url: Url,
    transcoder: Arc<dyn AudioTranscoder>,
}

impl ArtifactStager {
    /// Create a stager rooted at `public_root`, publishing under `base_url`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `base_url` is not an absolute URL that can
    /// carry a path (e.g. `mailto:` or a bare host name).
    pub fn new(
        public_root: impl Into<PathBuf>,
        base_url: &str,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::Config {
                message: format!("public base URL '{base_url}' cannot be used for download links"),
                key: Some("storage.public_base_url".into()),
            })?;

        Ok(Self {
            public_root: public_root.into(),
            base_url,
            transcoder,
        })
    }

    /// Root holding every public directory
    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    /// Name of the transcoder used for audio extraction
    pub fn transcoder_name(&self) -> &'static str {
        self.transcoder.name()
    }

    /// Public directory of a shortcode: `<public-root>/<shortcode>`
    pub fn public_dir(&self, shortcode: &Shortcode) -> PathBuf {
        self.public_root.join(shortcode)
    }

    /// Download URL of `file` inside a shortcode's public directory
    pub fn download_url(&self, shortcode: &Shortcode, file: &str) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([STATIC_ROUTE, shortcode.as_str(), file]);
        }
        url.set_query(None);
        url.set_fragment(None);
        url.to_string()
    }

    /// Move the fetched video into the public directory and extract its audio
    ///
    /// The lexicographically first `.mp4` of `working_dir` becomes
    /// `<public>/<shortcode>.mp4`; the transcoder output becomes
    /// `<public>/audio.mp3`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::NoMediaFound`] when the working directory holds no video
    ///   (or does not exist). Nothing is created in that case.
    /// - [`crate::error::StageError::MoveFailed`] when a move fails.
    /// - The transcoder's error (normally a [`crate::error::TranscodeError`]);
    ///   the staged video is left in place.
    pub async fn stage(&self, working_dir: &Path, shortcode: &Shortcode) -> Result<StagedArtifacts> {
        let video = match first_file_with_extension(working_dir, VIDEO_EXTENSIONS).await {
            Ok(Some(video)) => video,
            Ok(None) => {
                return Err(FetchError::NoMediaFound {
                    dir: working_dir.to_path_buf(),
                }
                .into());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NoMediaFound {
                    dir: working_dir.to_path_buf(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        let public_dir = self.public_dir(shortcode);
        tokio::fs::create_dir_all(&public_dir).await?;

        let extension = video
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| VIDEO_EXTENSIONS[0].to_string());
        let video_name = format!("{shortcode}.{extension}");
        let video_path = public_dir.join(&video_name);

        move_file(&video, &video_path).await?;
        debug!(shortcode = %shortcode, ?video_path, "video staged");

        let produced = self.transcoder.transcode(&video_path).await?;
        let audio_path = public_dir.join(AUDIO_FILE_NAME);
        if produced != audio_path {
            move_file(&produced, &audio_path).await?;
        }

        info!(
            shortcode = %shortcode,
            transcoder = self.transcoder.name(),
            "artifacts staged"
        );

        Ok(StagedArtifacts {
            video_url: self.download_url(shortcode, &video_name),
            audio_url: self.download_url(shortcode, AUDIO_FILE_NAME),
            public_dir,
            video_path,
            audio_path,
        })
    }
}
