//! Shutdown coordination.

use super::ReelService;
use crate::types::Event;
use std::sync::atomic::Ordering;

impl ReelService {
    /// Gracefully shut down the service
    ///
    /// Stops accepting new requests, stops the cleanup workers and emits
    /// [`Event::Shutdown`]. Deletions that were still pending are dropped: the
    /// directories stay on disk until removed by hand or by a later run.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new requests");

        let pending = self.cleanup.pending();
        if pending > 0 {
            tracing::warn!(pending, "Dropping pending cleanup tasks");
        }
        self.cleanup.shutdown().await;

        self.emit_event(Event::Shutdown);
        tracing::info!("Shutdown complete");
    }

    /// Whether new requests are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }
}
