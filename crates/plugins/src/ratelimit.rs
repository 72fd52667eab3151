//! Rate limiting for outbound plugin traffic.
//!
//! Plugins ask a [`RateLimiter`] for a yes/no verdict and never own the
//! counters themselves. [`FixedWindowRateLimiter`] is the in-process
//! implementation; hosts with a shared backend provide their own.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

/// Verdict source for per-key request limits.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one request for `key` and report whether it exceeds `limit`
    /// requests within `window`.
    async fn is_limited(&self, key: &str, limit: u32, window: Duration) -> bool;
}

/// Counter state for one key.
#[derive(Debug, Clone)]
struct WindowEntry {
    request_count: u32,
    window_start: DateTime<Utc>,
}

/// In-memory fixed-window limiter.
#[derive(Debug, Default)]
pub struct FixedWindowRateLimiter {
    windows: Mutex<HashMap<String, WindowEntry>>,
}

impl FixedWindowRateLimiter {
    /// Create a limiter with no recorded requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn check_at(&self, key: &str, limit: u32, window: Duration, now: DateTime<Utc>) -> bool {
        let window =
            chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(365));
        let mut windows = self.windows.lock().await;

        // Drop expired windows, including this key's.
        windows.retain(|_, entry| now - entry.window_start < window);

        let entry = windows
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                request_count: 0,
                window_start: now,
            });

        if entry.request_count >= limit {
            debug!(key, limit, "Rate limit exceeded");
            return true;
        }

        entry.request_count += 1;
        false
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn is_limited(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.check_at(key, limit, window, Utc::now()).await
    }
}

/// Limiter that never limits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn is_limited(&self, _key: &str, _limit: u32, _window: Duration) -> bool {
        false
    }
}
