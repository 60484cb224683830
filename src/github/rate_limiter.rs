use reqwest::header::HeaderMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

/// Shared request budget for one GitHub token.
///
/// Tracks the primary limit reported in `x-ratelimit-*` headers and applies a
/// soft per-minute throttle on top of it.
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
    requests_per_minute: u32,
}

struct RateLimitState {
    remaining: u32,
    reset_at: Option<Instant>,
    requests_this_minute: u32,
    minute_start: Instant,
}

impl RateLimiter {
    /// `requests_per_minute` of 0 disables the soft throttle.
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            state: Mutex::new(RateLimitState {
                remaining: 5000,
                reset_at: None,
                requests_this_minute: 0,
                minute_start: Instant::now(),
            }),
            requests_per_minute,
        }
    }

    pub async fn wait(&self) {
        let mut state = self.state.lock().await;

        if state.remaining == 0 {
            if let Some(reset_at) = state.reset_at {
                let now = Instant::now();
                if reset_at > now {
                    let wait_duration = reset_at - now;
                    drop(state);
                    tracing::info!("Rate limited, waiting {:?}", wait_duration);
                    sleep(wait_duration).await;
                    state = self.state.lock().await;
                }
            }
            state.reset_at = None;
        }

        if self.requests_per_minute == 0 {
            return;
        }

        let minute_elapsed = state.minute_start.elapsed();
        if minute_elapsed < Duration::from_secs(60) {
            if state.requests_this_minute >= self.requests_per_minute {
                let wait_time = Duration::from_secs(60) - minute_elapsed;
                drop(state);
                tracing::debug!("Soft rate limiting, waiting {:?}", wait_time);
                sleep(wait_time).await;
                state = self.state.lock().await;
                state.requests_this_minute = 0;
                state.minute_start = Instant::now();
            }
        } else {
            state.requests_this_minute = 0;
            state.minute_start = Instant::now();
        }

        state.requests_this_minute += 1;
    }

    pub async fn observe(&self, headers: &HeaderMap) {
        let Some(remaining) = header_u64(headers, "x-ratelimit-remaining") else {
            return;
        };

        let mut state = self.state.lock().await;
        state.remaining = remaining.min(u32::MAX as u64) as u32;
        if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
            let wait_secs = seconds_until(reset);
            if wait_secs > 0 {
                state.reset_at = Some(Instant::now() + Duration::from_secs(wait_secs));
            }
        }
    }

    pub async fn remaining(&self) -> u32 {
        self.state.lock().await.remaining
    }

    /// Seconds until the window in `x-ratelimit-reset` opens again, 0 if unknown.
    pub fn seconds_until_reset(headers: &HeaderMap) -> u64 {
        header_u64(headers, "x-ratelimit-reset")
            .map(seconds_until)
            .unwrap_or(0)
    }

    pub fn is_exhausted(headers: &HeaderMap) -> bool {
        header_u64(headers, "x-ratelimit-remaining") == Some(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(60)
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn seconds_until(reset_timestamp: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    reset_timestamp.saturating_sub(now)
}
