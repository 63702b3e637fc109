//! The reel request pipeline.

use super::ReelService;
use crate::error::{Error, Result};
use crate::fetcher::FetchRequest;
use crate::shortcode::{extract_hashtags, extract_shortcode, is_valid_reel_url};
use crate::staging::read_caption;
use crate::types::{Event, ReelResponse, Shortcode};
use std::path::Path;
use std::sync::atomic::Ordering;

impl ReelService {
    /// Download a reel and stage its video and audio for download
    ///
    /// Runs the whole pipeline on the calling task:
    /// 1. Validates the URL and extracts the shortcode (no side effects on failure)
    /// 2. Asks the proxy rotator for this request's proxy
    /// 3. Fetches the reel into `<work-root>/<shortcode>`
    /// 4. Reads caption and hashtags
    /// 5. Stages video and audio under `<public-root>/<shortcode>`
    /// 6. Schedules deletion of both directories and returns immediately
    ///
    /// Deletion is scheduled whenever the public directory exists after staging,
    /// including when audio extraction failed after the video was moved.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has started
    /// - [`Error::InvalidUrl`] for a missing, malformed or non-reel URL
    /// - [`Error::Fetch`] when proxy rotation or the fetch fails, or no video was retrieved
    /// - [`Error::Transcode`] when audio extraction fails
    pub async fn download_reel(&self, url: &str) -> Result<ReelResponse> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let shortcode = parse_reel_url(url)?;
        let working_dir = self.working_dir(&shortcode);

        let proxy = self.proxy.next_proxy().await?;
        tracing::debug!(
            shortcode = %shortcode,
            proxy = self.proxy.name(),
            "fetching reel"
        );

        let request = FetchRequest {
            shortcode: shortcode.clone(),
            target_dir: working_dir,
            proxy,
        };
        let fetched = self.fetcher.fetch(&request).await?;
        self.emit_event(Event::Fetched {
            shortcode: shortcode.clone(),
        });

        let caption = read_caption(&fetched.working_dir).await;
        let hashtags = extract_hashtags(&caption);

        let staged = match self.stager.stage(&fetched.working_dir, &shortcode).await {
            Ok(staged) => staged,
            Err(e) => {
                self.schedule_if_staged(&fetched.working_dir, &shortcode).await;
                tracing::warn!(shortcode = %shortcode, error = %e, "staging failed");
                return Err(e);
            }
        };
        self.emit_event(Event::Staged {
            shortcode: shortcode.clone(),
        });

        let scheduled = self.cleanup.schedule(
            staged.public_dir.clone(),
            fetched.working_dir.clone(),
            shortcode.clone(),
        );
        let expires_at = scheduled.due_at;

        tracing::info!(
            shortcode = %shortcode,
            task_id = %scheduled.id,
            %expires_at,
            "reel ready for download"
        );

        Ok(ReelResponse {
            status: "success".to_string(),
            caption,
            hashtags,
            video_download_url: staged.video_url,
            mp3_download_url: staged.audio_url,
            expires_at,
        })
    }

    /// Schedule cleanup after a failed staging attempt if it left a public directory
    async fn schedule_if_staged(&self, working_dir: &Path, shortcode: &Shortcode) {
        let public_dir = self.stager.public_dir(shortcode);
        if tokio::fs::try_exists(&public_dir).await.unwrap_or(false) {
            self.cleanup
                .schedule(public_dir, working_dir.to_path_buf(), shortcode.clone());
        }
    }
}

/// Validate a user-supplied reel URL and extract its shortcode
fn parse_reel_url(url: &str) -> Result<Shortcode> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::InvalidUrl("missing 'url' parameter".into()));
    }
    if !is_valid_reel_url(url) {
        return Err(Error::InvalidUrl(url.to_string()));
    }
    extract_shortcode(url)
        .ok_or_else(|| Error::InvalidUrl(format!("no usable shortcode in {url}")))
}
