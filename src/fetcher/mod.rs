//! Media retrieval
//!
//! The [`MediaFetcher`] trait is the seam between the service and whatever
//! actually talks to Instagram. Two implementations are provided:
//!
//! - [`InstaloaderFetcher`]: runs the external `instaloader` binary
//! - [`UnavailableFetcher`]: stand-in when no fetcher binary is installed, so the
//!   service still starts and reports `not_supported` per request

mod instaloader;
mod traits;

pub use instaloader::InstaloaderFetcher;
pub use traits::{FetchRequest, MediaFetcher};

use crate::types::FetchedMedia;
use async_trait::async_trait;

/// Fetcher used when no fetcher binary is available
pub struct UnavailableFetcher;

#[async_trait]
impl MediaFetcher for UnavailableFetcher {
    async fn fetch(&self, _request: &FetchRequest) -> crate::Result<FetchedMedia> {
        Err(crate::Error::NotSupported(
            "fetching reels requires the instaloader binary. \
             Configure instaloader_path in config or ensure instaloader is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
