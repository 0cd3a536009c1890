//! RateLimiter - minimum spacing between live device invocations

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum delay between the end of one invocation and the start
/// of the next
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    /// Time left before the next invocation may start
    pub fn remaining(&self) -> Duration {
        match self.last {
            Some(last) => (last + self.delay).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Wait out the window; returns immediately before the first invocation
    pub async fn wait(&self) {
        let Some(last) = self.last else {
            return;
        };
        let remaining = self.remaining();
        if !remaining.is_zero() {
            debug!(remaining_ms = remaining.as_millis() as u64, "RateLimiter::wait: sleeping");
            tokio::time::sleep_until(last + self.delay).await;
        }
    }

    /// Note that an invocation just completed
    pub fn mark(&mut self) {
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_wait_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(30));
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_measures_from_mark() {
        let mut limiter = RateLimiter::new(Duration::from_secs(30));
        limiter.mark();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(limiter.remaining(), Duration::from_secs(20));

        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_after_window_is_immediate() {
        let mut limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.mark();
        tokio::time::sleep(Duration::from_secs(5)).await;
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
