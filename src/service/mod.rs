//! The reel service: owns the collaborators and the cleanup scheduler.
//!
//! - [`download`] - The request pipeline (validate, rotate proxy, fetch, stage, schedule)
//! - [`lifecycle`] - Shutdown coordination

mod download;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::cleanup::CleanupScheduler;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{InstaloaderFetcher, MediaFetcher, UnavailableFetcher};
use crate::proxy::{self, ProxyRotator};
use crate::staging::ArtifactStager;
use crate::transcode::{AudioTranscoder, FfmpegTranscoder, UnavailableTranscoder};
use crate::types::{Capabilities, Event, Shortcode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// External collaborators the service drives
///
/// [`ReelService::new`] detects these from the configuration; tests and
/// embedders can supply their own through [`ReelService::with_collaborators`].
#[derive(Clone)]
pub struct Collaborators {
    /// Retrieves media into a working directory
    pub fetcher: Arc<dyn MediaFetcher>,
    /// Extracts audio from a staged video
    pub transcoder: Arc<dyn AudioTranscoder>,
    /// Picks the proxy for each fetch
    pub proxy: Arc<dyn ProxyRotator>,
}

impl Collaborators {
    /// Build collaborators from configuration, searching PATH when allowed
    ///
    /// A missing binary is not an error: the corresponding stand-in reports
    /// `not_supported` per request, so the service can still start.
    pub fn from_config(config: &Config) -> Self {
        let tools = &config.tools;

        let fetcher: Arc<dyn MediaFetcher> = if let Some(ref path) = tools.instaloader_path {
            Arc::new(InstaloaderFetcher::new(path.clone()).with_timeout(tools.fetch_timeout))
        } else if tools.search_path {
            InstaloaderFetcher::from_path()
                .map(|f| Arc::new(f.with_timeout(tools.fetch_timeout)) as Arc<dyn MediaFetcher>)
                .unwrap_or_else(|| Arc::new(UnavailableFetcher))
        } else {
            Arc::new(UnavailableFetcher)
        };

        let transcoder: Arc<dyn AudioTranscoder> = if let Some(ref path) = tools.ffmpeg_path {
            Arc::new(
                FfmpegTranscoder::new(path.clone())
                    .with_bitrate(tools.audio_bitrate.clone())
                    .with_timeout(tools.transcode_timeout),
            )
        } else if tools.search_path {
            FfmpegTranscoder::from_path()
                .map(|t| {
                    Arc::new(
                        t.with_bitrate(tools.audio_bitrate.clone())
                            .with_timeout(tools.transcode_timeout),
                    ) as Arc<dyn AudioTranscoder>
                })
                .unwrap_or_else(|| Arc::new(UnavailableTranscoder))
        } else {
            Arc::new(UnavailableTranscoder)
        };

        Self {
            fetcher,
            transcoder,
            proxy: proxy::from_config(&config.proxy),
        }
    }
}

/// Main service instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ReelService {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Media fetcher
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    /// Proxy rotation before each fetch
    pub(crate) proxy: Arc<dyn ProxyRotator>,
    /// Moves artifacts into the public root
    pub(crate) stager: Arc<ArtifactStager>,
    /// Deferred deletion of both directories
    pub(crate) cleanup: Arc<CleanupScheduler>,
    /// Flag to indicate whether new requests are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl ReelService {
    /// Create a new ReelService with collaborators detected from `config`
    ///
    /// This validates the configuration, creates the working and public roots,
    /// picks the fetcher, transcoder and proxy strategy, and starts the cleanup
    /// workers.
    pub async fn new(config: Config) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config);
        Self::with_collaborators(config, collaborators).await
    }

    /// Create a new ReelService with explicit collaborators
    pub async fn with_collaborators(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        ensure_dir(&config.storage.work_dir, "working").await?;
        ensure_dir(&config.storage.public_dir, "public").await?;

        let stager = ArtifactStager::new(
            config.storage.public_dir.clone(),
            &config.storage.public_base_url,
            collaborators.transcoder.clone(),
        )?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let cleanup = CleanupScheduler::new(&config.cleanup, event_tx.clone());

        tracing::info!(
            fetcher = collaborators.fetcher.name(),
            transcoder = collaborators.transcoder.name(),
            proxy = collaborators.proxy.name(),
            "Reel service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            event_tx,
            fetcher: collaborators.fetcher,
            proxy: collaborators.proxy,
            stager: Arc::new(stager),
            cleanup: Arc::new(cleanup),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to lifecycle events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Report which collaborators are in use
    pub fn capabilities(&self) -> Capabilities {
        let fetcher = self.fetcher.name().to_string();
        let transcoder = self.stager.transcoder_name().to_string();
        let can_download = fetcher != "unavailable" && transcoder != "unavailable";

        Capabilities {
            fetcher,
            transcoder,
            proxy: self.proxy.name().to_string(),
            can_download,
        }
    }

    /// The cleanup scheduler (task status and pending count)
    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    /// Root of the public directories served under `/static`
    pub fn public_root(&self) -> &Path {
        self.stager.public_root()
    }

    /// Working directory the fetcher populates for a shortcode
    pub fn working_dir(&self, shortcode: &Shortcode) -> PathBuf {
        self.config.storage.work_dir.join(shortcode)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

async fn ensure_dir(dir: &Path, label: &str) -> Result<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to create {label} directory '{}': {}",
                dir.display(),
                e
            ),
        ))
    })
}
