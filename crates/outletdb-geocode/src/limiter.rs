//! Sliding-window request limiter.
//!
//! At most `max_requests` permits are granted within any `window`-long span.
//! Callers that would exceed the ceiling wait; nothing is ever dropped.
//! Waiters queue on a fair async mutex, so permits are handed out in arrival
//! order whatever the caller concurrency.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct WindowRateLimiter {
    max_requests: usize,
    window: Duration,
    granted: Mutex<VecDeque<Instant>>,
}

impl WindowRateLimiter {
    /// `max_requests` is clamped to at least 1.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_requests = usize::try_from(max_requests.max(1)).unwrap_or(usize::MAX);
        Self {
            max_requests,
            window,
            granted: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Waits until a request may be sent, then records it.
    pub async fn acquire(&self) {
        let mut granted = self.granted.lock().await;
        loop {
            let now = Instant::now();
            while granted
                .front()
                .is_some_and(|sent| now.duration_since(*sent) >= self.window)
            {
                granted.pop_front();
            }

            if granted.len() < self.max_requests {
                granted.push_back(now);
                return;
            }

            // Full window: the oldest grant expires first.
            if let Some(oldest) = granted.front().copied() {
                let wait = self.window.saturating_sub(now.duration_since(oldest));
                tracing::debug!(
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "geocode rate limit reached, waiting"
                );
                tokio::time::sleep(wait).await;
            }
        }
    }
}
