//! Injectable rate-limit store.
//!
//! Owned by whichever component composes orchestrators; there is no
//! process-wide limiter.

use async_trait::async_trait;
use mindshift_core::config::RateLimitConfig;
use mindshift_core::error::{Result, ShiftError};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Counts requests per user id within a time window.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records one request for `user_id`.
    ///
    /// # Errors
    ///
    /// `ShiftError::RateLimited` when the user's budget for the current
    /// window is spent. Rejected requests are not counted.
    async fn check(&self, user_id: &str) -> Result<()>;

    /// Forgets all windows for `user_id`.
    async fn reset(&self, user_id: &str);
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window limiter kept in memory.
#[derive(Debug)]
pub struct InMemoryRateLimitStore {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimitStore {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Number of users with a live window.
    pub async fn tracked_users(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn check(&self, user_id: &str) -> Result<()> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        // Expired windows would be reset on next use anyway.
        windows.retain(|_, w| now.duration_since(w.started) < self.window);
        let window = windows.entry(user_id.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if window.count >= self.max_requests {
            let remaining = self.window.saturating_sub(now.duration_since(window.started));
            let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            tracing::debug!(user_id, retry_after_secs, "Rate limit reached");
            return Err(ShiftError::RateLimited { retry_after_secs });
        }

        window.count += 1;
        Ok(())
    }

    async fn reset(&self, user_id: &str) {
        self.windows.lock().await.remove(user_id);
    }
}
