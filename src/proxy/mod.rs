//! Proxy selection before each fetch
//!
//! A [`ProxyRotator`] runs before every fetch and yields the proxy that fetch
//! should use. Any failure short-circuits the request with a
//! [`FetchError::ProxyRotation`](crate::error::FetchError::ProxyRotation).

mod tor;

pub use tor::TorRotator;

use crate::config::ProxyConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for choosing (and possibly rotating) the proxy of the next fetch
#[async_trait]
pub trait ProxyRotator: Send + Sync {
    /// Prepare a proxy for one fetch and return its URL (`None` = direct)
    async fn next_proxy(&self) -> crate::Result<Option<String>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// No proxy: fetch directly
pub struct DirectConnection;

#[async_trait]
impl ProxyRotator for DirectConnection {
    async fn next_proxy(&self) -> crate::Result<Option<String>> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// The same proxy URL for every fetch
pub struct StaticProxy {
    url: String,
}

impl StaticProxy {
    /// Create a rotator that always yields `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ProxyRotator for StaticProxy {
    async fn next_proxy(&self) -> crate::Result<Option<String>> {
        Ok(Some(self.url.clone()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Pick the rotator described by `config` (Tor, then static URL, then direct)
pub fn from_config(config: &ProxyConfig) -> Arc<dyn ProxyRotator> {
    match (&config.tor, &config.url) {
        (Some(tor), _) => Arc::new(TorRotator::new(tor.clone())),
        (None, Some(url)) => Arc::new(StaticProxy::new(url.clone())),
        (None, None) => Arc::new(DirectConnection),
    }
}
