//! Fake collaborators and service builders for integration tests

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use reel_dl::fetcher::FetchRequest;
use reel_dl::{
    AudioTranscoder, Collaborators, Config, DirectConnection, FetchError, FetchedMedia,
    MediaFetcher, ReelService,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Base URL baked into download links
pub const BASE_URL: &str = "http://cdn.reels.test/media";

/// Fetcher that drops a video and caption into the working directory
///
/// Shortcodes starting with `private` fail the way instaloader does for
/// login-walled reels.
#[derive(Default)]
pub struct ScriptedFetcher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> reel_dl::Result<FetchedMedia> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if request.shortcode.as_str().starts_with("private") {
            return Err(FetchError::ToolFailed {
                shortcode: request.shortcode.to_string(),
                reason: "Login required".into(),
            }
            .into());
        }

        let dir = &request.target_dir;
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join("2024-06-02_18-30-00_UTC.mp4"), b"mp4 bytes").await?;
        tokio::fs::write(
            dir.join("2024-06-02_18-30-00_UTC.txt"),
            "Morning swim\r\n#ocean #swim #fitness",
        )
        .await?;
        tokio::fs::write(dir.join("2024-06-02_18-30-00_UTC.json.xz"), b"meta").await?;

        Ok(FetchedMedia {
            working_dir: dir.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Transcoder that writes a placeholder MP3 next to the video
pub struct PlaceholderTranscoder;

#[async_trait]
impl AudioTranscoder for PlaceholderTranscoder {
    async fn transcode(&self, video: &Path) -> reel_dl::Result<PathBuf> {
        let audio = video.with_extension("mp3");
        tokio::fs::write(&audio, b"mp3 bytes").await?;
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}

/// A service over fake collaborators; keep `_temp_dir` alive for the test
pub struct Harness {
    pub service: Arc<ReelService>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub root: PathBuf,
    pub _temp_dir: TempDir,
}

/// Build a harness whose cleanup runs after `delay`
pub async fn harness(delay: Duration) -> Harness {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().to_path_buf();

    let mut config = Config::default();
    config.storage.work_dir = root.join("work");
    config.storage.public_dir = root.join("public");
    config.storage.public_base_url = BASE_URL.to_string();
    config.cleanup.delay = delay;
    config.cleanup.workers = 2;

    let fetcher = Arc::new(ScriptedFetcher::default());
    let service = ReelService::with_collaborators(
        config,
        Collaborators {
            fetcher: fetcher.clone(),
            transcoder: Arc::new(PlaceholderTranscoder),
            proxy: Arc::new(DirectConnection),
        },
    )
    .await
    .unwrap();

    Harness {
        service: Arc::new(service),
        fetcher,
        root,
        _temp_dir: temp_dir,
    }
}

/// GET request from localhost, as the rate limiter expects
pub fn get(uri: &str) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((Ipv4Addr::LOCALHOST, 50000))));
    request
}

/// `/download/reel` URI for a reel URL
pub fn reel_uri(url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    format!("/download/reel?url={encoded}")
}

/// Collect a JSON body
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
