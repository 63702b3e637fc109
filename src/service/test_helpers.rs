//! Shared test helpers: fake collaborators and ReelService construction.

use crate::config::Config;
use crate::error::{FetchError, TranscodeError};
use crate::fetcher::{FetchRequest, MediaFetcher};
use crate::proxy::{DirectConnection, ProxyRotator};
use crate::service::{Collaborators, ReelService};
use crate::transcode::AudioTranscoder;
use crate::types::FetchedMedia;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Base URL used for download links in tests
pub(crate) const TEST_BASE_URL: &str = "http://reels.test";

/// What the fake fetcher leaves in the working directory
#[derive(Clone, Debug)]
pub(crate) enum FetchBehavior {
    /// A video plus an optional caption file
    Video { caption: Option<&'static str> },
    /// Only a caption; no video
    CaptionOnly,
    /// The tool fails
    Fail,
}

/// Fetcher that writes canned files and records every request
pub(crate) struct FakeFetcher {
    behavior: FetchBehavior,
    requests: Mutex<Vec<FetchRequest>>,
}

impl FakeFetcher {
    pub(crate) fn new(behavior: FetchBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, request: &FetchRequest) -> crate::Result<FetchedMedia> {
        self.requests.lock().unwrap().push(request.clone());
        let dir = &request.target_dir;

        match &self.behavior {
            FetchBehavior::Fail => {
                return Err(FetchError::ToolFailed {
                    shortcode: request.shortcode.to_string(),
                    reason: "401 Unauthorized".into(),
                }
                .into());
            }
            FetchBehavior::CaptionOnly => {
                tokio::fs::create_dir_all(dir).await?;
                tokio::fs::write(dir.join("post.txt"), "text only").await?;
            }
            FetchBehavior::Video { caption } => {
                tokio::fs::create_dir_all(dir).await?;
                tokio::fs::write(dir.join("2024-05-01_10-00-00_UTC.mp4"), b"fake video").await?;
                if let Some(caption) = caption {
                    tokio::fs::write(dir.join("2024-05-01_10-00-00_UTC.txt"), caption).await?;
                }
            }
        }

        Ok(FetchedMedia {
            working_dir: dir.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Transcoder that writes a fake MP3 beside the video, or fails
pub(crate) struct FakeTranscoder {
    pub(crate) fail: bool,
}

#[async_trait]
impl AudioTranscoder for FakeTranscoder {
    async fn transcode(&self, video: &Path) -> crate::Result<PathBuf> {
        if self.fail {
            return Err(TranscodeError::ToolFailed {
                video: video.to_path_buf(),
                reason: "Invalid data found when processing input".into(),
            }
            .into());
        }
        let audio = video.with_extension("mp3");
        tokio::fs::write(&audio, b"ID3 fake audio").await?;
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Proxy rotator whose control channel is down
pub(crate) struct BrokenRotator;

#[async_trait]
impl ProxyRotator for BrokenRotator {
    async fn next_proxy(&self) -> crate::Result<Option<String>> {
        Err(FetchError::ProxyRotation {
            reason: "control port refused connection".into(),
        }
        .into())
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Test configuration rooted in `root` with the given cleanup delay
pub(crate) fn test_config(root: &Path, delay: Duration) -> Config {
    let mut config = Config::default();
    config.storage.work_dir = root.join("downloads");
    config.storage.public_dir = root.join("static");
    config.storage.public_base_url = TEST_BASE_URL.to_string();
    config.cleanup.delay = delay;
    config.cleanup.workers = 2;
    config
}

/// Everything a service test needs; keep `_temp_dir` alive for the test's duration
pub(crate) struct TestService {
    pub(crate) service: ReelService,
    pub(crate) fetcher: Arc<FakeFetcher>,
    pub(crate) root: PathBuf,
    pub(crate) _temp_dir: tempfile::TempDir,
}

/// Build a service around fake collaborators
pub(crate) async fn create_test_service_with(
    fetch: FetchBehavior,
    transcode_fails: bool,
    proxy: Arc<dyn ProxyRotator>,
    delay: Duration,
) -> TestService {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path().to_path_buf();
    let fetcher = Arc::new(FakeFetcher::new(fetch));

    let service = ReelService::with_collaborators(
        test_config(&root, delay),
        Collaborators {
            fetcher: fetcher.clone(),
            transcoder: Arc::new(FakeTranscoder {
                fail: transcode_fails,
            }),
            proxy,
        },
    )
    .await
    .unwrap();

    TestService {
        service,
        fetcher,
        root,
        _temp_dir: temp_dir,
    }
}

/// Service whose collaborators all succeed, with a 240 second cleanup delay
pub(crate) async fn create_test_service() -> TestService {
    create_test_service_with(
        FetchBehavior::Video {
            caption: Some("Sunset run\n#travel #sea"),
        },
        false,
        Arc::new(DirectConnection),
        Duration::from_secs(240),
    )
    .await
}
