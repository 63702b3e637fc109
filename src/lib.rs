//! # reel-dl
//!
//! HTTP service that fetches Instagram Reels, stages the video and an
//! extracted MP3 for temporary download, and deletes both after a delay.
//!
//! ## Pipeline
//!
//! A request to `GET /download/reel?url=` walks through:
//! - **Shortcode extraction** - the reel URL is validated and reduced to its shortcode
//! - **Proxy rotation** - optionally asks Tor for a fresh circuit
//! - **Fetch** - instaloader downloads the reel into a per-shortcode working directory
//! - **Staging** - the video moves to a public directory and ffmpeg extracts `audio.mp3`
//! - **Deferred cleanup** - both directories are deleted once the delay elapses
//!
//! ## Quick Start
//!
//! ```no_run
//! use reel_dl::{Config, ReelService, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let service = Arc::new(ReelService::new(config).await?);
//!
//!     // Subscribe to lifecycle events
//!     let mut events = service.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     run_with_shutdown(service).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

use std::sync::Arc;

/// REST API module
pub mod api;
/// Deferred deletion of staged artifacts
pub mod cleanup;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Media retrieval (instaloader)
pub mod fetcher;
/// Proxy selection and Tor circuit rotation
pub mod proxy;
/// The reel service orchestrating fetch, staging and cleanup
pub mod service;
/// Reel URL parsing and hashtag extraction
pub mod shortcode;
/// Moving artifacts into the public directory
pub mod staging;
/// Audio extraction (ffmpeg)
pub mod transcode;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use cleanup::{CleanupScheduler, ScheduledCleanup};
pub use config::Config;
pub use error::{
    ApiError, CleanupError, Error, ErrorDetail, ErrorKind, FetchError, Result, StageError,
    ToHttpStatus, TranscodeError,
};
pub use fetcher::{InstaloaderFetcher, MediaFetcher};
pub use proxy::{DirectConnection, ProxyRotator, StaticProxy, TorRotator};
pub use service::{Collaborators, ReelService};
pub use transcode::{AudioTranscoder, FfmpegTranscoder};
pub use types::{
    Capabilities, CleanupState, CleanupTaskId, Event, FetchedMedia, ReelResponse, Shortcode,
    StagedArtifacts,
};

/// Serve the API until a termination signal arrives, then shut the service down.
///
/// In-flight requests finish before the server stops; pending cleanup tasks
/// are abandoned (their directories stay on disk).
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use reel_dl::{ReelService, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = Arc::new(ReelService::new(Config::default()).await?);
///     run_with_shutdown(service).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: Arc<ReelService>) -> Result<()> {
    let config = service.get_config();
    let served =
        api::start_api_server_with_shutdown(service.clone(), config, wait_for_signal()).await;
    service.shutdown().await;
    served
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
