//! Minimum-gap rate limiter for outbound lookups
//!
//! One limiter instance is shared (via `Arc`) by everything that talks to the
//! external match source. It is a strict serializer, not a token bucket: at
//! most one call may start per interval, and waiting callers are released in
//! arrival order because `tokio::sync::Mutex` is fair.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// MusicBrainz allows one request per second per client
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct RateLimiter {
    last_call: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_call: Mutex::new(None),
            min_interval,
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next call is allowed to start
    ///
    /// The lock is held while sleeping so the next caller measures its gap
    /// from this call's stamp.
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}
