//! Fetcher backed by the external `instaloader` binary

use super::traits::{FetchRequest, MediaFetcher};
use crate::error::FetchError;
use crate::types::FetchedMedia;
use crate::utils::{ToolRunError, run_tool, stderr_tail};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Fetcher that shells out to `instaloader`
///
/// Runs `instaloader --dirname-pattern <target> -- -<shortcode>`, which writes
/// the reel's video and caption into the target directory. The request's proxy
/// is passed to that one child process through `HTTP(S)_PROXY`.
///
/// # Examples
///
/// ```no_run
/// use reel_dl::fetcher::{FetchRequest, InstaloaderFetcher, MediaFetcher};
/// use reel_dl::types::Shortcode;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = InstaloaderFetcher::from_path().expect("instaloader not found in PATH");
/// let request = FetchRequest {
///     shortcode: Shortcode::parse("ABC123").unwrap(),
///     target_dir: "downloads/ABC123".into(),
///     proxy: None,
/// };
/// let media = fetcher.fetch(&request).await?;
/// println!("fetched into {:?}", media.working_dir);
/// # Ok(())
/// # }
/// ```
pub struct InstaloaderFetcher {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl InstaloaderFetcher {
    /// Create a fetcher with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            timeout: None,
        }
    }

    /// Attempt to find instaloader in PATH
    pub fn from_path() -> Option<Self> {
        which::which("instaloader").ok().map(Self::new)
    }

    /// Kill the child process if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, request: &FetchRequest) -> Command {
        let mut command = Command::new(&self.binary_path);
        command
            .arg("--quiet")
            .arg("--no-profile-pic")
            .arg("--no-metadata-json")
            .arg("--no-video-thumbnails")
            .arg("--dirname-pattern")
            .arg(&request.target_dir)
            .arg("--")
            .arg(format!("-{}", request.shortcode));

        if let Some(proxy) = &request.proxy {
            command
                .env("HTTPS_PROXY", proxy)
                .env("HTTP_PROXY", proxy);
        }

        command
    }
}

#[async_trait]
impl MediaFetcher for InstaloaderFetcher {
    async fn fetch(&self, request: &FetchRequest) -> crate::Result<FetchedMedia> {
        if let Some(parent) = request.target_dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::debug!(
            shortcode = %request.shortcode,
            target = ?request.target_dir,
            proxied = request.proxy.is_some(),
            "running instaloader"
        );

        let output = run_tool(self.command(request), self.timeout)
            .await
            .map_err(|e| match e {
                ToolRunError::Spawn(e) => FetchError::ToolFailed {
                    shortcode: request.shortcode.to_string(),
                    reason: format!("failed to execute instaloader: {e}"),
                },
                ToolRunError::TimedOut(limit) => FetchError::Timeout {
                    shortcode: request.shortcode.to_string(),
                    seconds: limit.as_secs(),
                },
            })?;

        if !output.status.success() {
            return Err(FetchError::ToolFailed {
                shortcode: request.shortcode.to_string(),
                reason: stderr_tail(&output),
            }
            .into());
        }

        Ok(FetchedMedia {
            working_dir: request.target_dir.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "instaloader"
    }
}
