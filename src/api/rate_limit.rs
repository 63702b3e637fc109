//! Per-IP rate limiting for the API
//!
//! Each client IP gets a token bucket refilled at `requests_per_minute / 60`
//! tokens per second and holding at most `burst_size` tokens. Exempt paths
//! (prefix match) and exempt IPs bypass the limiter.
//!
//! Once [`MAX_TRACKED_CLIENTS`] IPs are tracked, buckets that have
//! refilled to capacity are dropped; a dropped client starts over with a full
//! bucket, which is exactly the state it was evicted in.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Instant,
};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

/// Number of tracked client IPs above which idle buckets are evicted
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Token bucket for one client
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    /// Tokens per second
    rate: f64,
    capacity: u32,
}

impl TokenBucket {
    fn new(rate: f64, capacity: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
            rate,
            capacity,
        }
    }

    /// Whether the bucket has refilled to capacity by `now`
    fn is_full(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens + elapsed * self.rate >= self.capacity as f64
    }

    /// Take one token, or return the whole seconds until one is available
    fn try_consume(&mut self, now: Instant) -> Option<u64> {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            Some(((1.0 - self.tokens) / self.rate).ceil() as u64)
        }
    }
}

/// Rate limiter with per-IP tracking
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    config: RateLimitConfig,
    max_tracked_clients: usize,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
            max_tracked_clients: MAX_TRACKED_CLIENTS,
        }
    }

    fn is_path_exempt(&self, path: &str) -> bool {
        self.config
            .exempt_paths
            .iter()
            .any(|exempt| path.starts_with(exempt.as_str()))
    }

    fn is_ip_exempt(&self, ip: IpAddr) -> bool {
        self.config.exempt_ips.contains(&ip)
    }

    /// Check a request; returns `Some(retry_after_seconds)` when it must be rejected
    pub async fn check(&self, path: &str, addr: SocketAddr) -> Option<u64> {
        self.check_at(path, addr.ip(), Instant::now()).await
    }

    async fn check_at(&self, path: &str, ip: IpAddr, now: Instant) -> Option<u64> {
        if self.is_path_exempt(path) || self.is_ip_exempt(ip) {
            return None;
        }

        let rate = f64::from(self.config.requests_per_minute.max(1)) / 60.0;
        let capacity = self.config.burst_size.max(1);

        let mut buckets = self.buckets.lock().await;
        if buckets.len() >= self.max_tracked_clients && !buckets.contains_key(&ip) {
            let before = buckets.len();
            buckets.retain(|_, bucket| !bucket.is_full(now));
            tracing::debug!(
                evicted = before - buckets.len(),
                tracked = buckets.len(),
                "evicted idle rate limit buckets"
            );
        }
        buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(rate, capacity))
            .try_consume(now)
    }
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    match limiter.check(req.uri().path(), addr).await {
        None => next.run(req).await,
        Some(retry_after) => {
            tracing::debug!(client = %addr.ip(), retry_after, "rate limited");
            let error = ApiError::with_details(
                "rate_limited",
                "Too many requests",
                serde_json::json!({ "retry_after_seconds": retry_after }),
            );
            (StatusCode::TOO_MANY_REQUESTS, Json(error)).into_response()
        }
    }
}
