//! Traits and types for media retrieval

use crate::types::{FetchedMedia, Shortcode};
use async_trait::async_trait;
use std::path::PathBuf;

/// Everything one fetch needs, built fresh for every request
///
/// The proxy lives here rather than on the fetcher so concurrent requests never
/// observe each other's proxy choice.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    /// Reel to fetch
    pub shortcode: Shortcode,
    /// Working directory to populate (`<work-root>/<shortcode>`)
    pub target_dir: PathBuf,
    /// Proxy URL for this fetch only
    pub proxy: Option<String>,
}

/// Trait for retrieving a reel's video and caption
///
/// Implementations populate [`FetchRequest::target_dir`] with at least one video
/// file and, when the reel has one, a `.txt` caption file.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the reel into the request's working directory
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::FetchError`] when the tool fails or times out,
    /// or [`crate::Error::NotSupported`] when no fetcher is available.
    async fn fetch(&self, request: &FetchRequest) -> crate::Result<FetchedMedia>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
