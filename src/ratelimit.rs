//! Rate limiting for outbound rewrite service requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::RateLimitConfig;
use crate::rewriter::RewriterKind;

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter for controlling request frequency per backend.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<HashMap<RewriterKind, RateLimitState>>>,
}

struct RateLimitState {
    /// Timestamps of recent requests.
    requests: Vec<Instant>,
    /// Last request time.
    last_request: Option<Instant>,
}

impl RateLimitState {
    fn new() -> Self {
        Self {
            requests: Vec::new(),
            last_request: None,
        }
    }

    fn cleanup_old_requests(&mut self, window: Duration) {
        let now = Instant::now();
        self.requests.retain(|t| now.saturating_duration_since(*t) < window);
    }
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            config: config.clone(),
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wait until a request is allowed for the given backend.
    ///
    /// The slot is reserved before sleeping, so concurrent callers are spaced
    /// out instead of firing together. Local rewrites are never throttled.
    pub async fn wait(&self, backend: RewriterKind) {
        if !backend.is_remote() {
            return;
        }

        let delay = self.reserve(backend);
        if delay > Duration::ZERO {
            tracing::debug!(
                "Rate limiting: waiting {:?} before request to {}",
                delay,
                backend
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Compute the delay for the next request and record it at its
    /// scheduled time, under one lock.
    fn reserve(&self, backend: RewriterKind) -> Duration {
        let mut state = self.state.lock();
        let backend_state = state.entry(backend).or_insert_with(RateLimitState::new);
        backend_state.cleanup_old_requests(WINDOW);

        let now = Instant::now();
        let delay = self.delay_for(backend_state, now);
        let scheduled = now + delay;
        backend_state.requests.push(scheduled);
        backend_state.last_request = Some(scheduled);
        delay
    }

    /// Calculate the delay needed before the next request.
    fn calculate_delay(&self, backend: RewriterKind) -> Duration {
        let mut state = self.state.lock();
        let backend_state = state.entry(backend).or_insert_with(RateLimitState::new);
        backend_state.cleanup_old_requests(WINDOW);
        self.delay_for(backend_state, Instant::now())
    }

    fn delay_for(&self, state: &RateLimitState, now: Instant) -> Duration {
        let mut delay = Duration::ZERO;

        let limit = self.config.requests_per_minute as usize;
        if limit > 0 && state.requests.len() >= limit {
            // The request `limit` places back must leave the window first
            let blocking = state.requests[state.requests.len() - limit];
            delay = delay.max((blocking + WINDOW).saturating_duration_since(now));
        }

        if let Some(last) = state.last_request {
            delay = delay.max((last + self.config.min_delay).saturating_duration_since(now));
        }

        delay
    }

    /// Check if a request is currently allowed without waiting.
    pub fn is_allowed(&self, backend: RewriterKind) -> bool {
        !backend.is_remote() || self.calculate_delay(backend) == Duration::ZERO
    }

    /// Get the current request count for a backend (in the last minute).
    pub fn request_count(&self, backend: RewriterKind) -> usize {
        let mut state = self.state.lock();
        let backend_state = state.entry(backend).or_insert_with(RateLimitState::new);
        backend_state.cleanup_old_requests(WINDOW);
        backend_state.requests.len()
    }

    /// Reset all rate limit state.
    pub fn reset_all(&self) {
        self.state.lock().clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_delay_ms: u64, per_minute: u32) -> RateLimitConfig {
        RateLimitConfig {
            min_delay: Duration::from_millis(min_delay_ms),
            requests_per_minute: per_minute,
        }
    }

    #[test]
    fn test_rate_limiter_basic() {
        let limiter = RateLimiter::new(&config(10_000, 60));

        assert!(limiter.is_allowed(RewriterKind::OpenAi));
        limiter.reserve(RewriterKind::OpenAi);

        // Second request should need to wait
        assert!(!limiter.is_allowed(RewriterKind::OpenAi));
        // Other backends are tracked separately
        assert!(limiter.is_allowed(RewriterKind::Hosted));
    }

    #[test]
    fn test_requests_per_minute_cap() {
        let limiter = RateLimiter::new(&config(0, 2));
        limiter.reserve(RewriterKind::Hosted);
        limiter.reserve(RewriterKind::Hosted);
        assert_eq!(limiter.request_count(RewriterKind::Hosted), 2);
        assert!(!limiter.is_allowed(RewriterKind::Hosted));

        limiter.reset_all();
        assert!(limiter.is_allowed(RewriterKind::Hosted));
    }

    #[test]
    fn test_back_to_back_reservations_are_spaced() {
        let limiter = RateLimiter::new(&config(10_000, 60));
        assert_eq!(limiter.reserve(RewriterKind::OpenAi), Duration::ZERO);
        let second = limiter.reserve(RewriterKind::OpenAi);
        assert!(second > Duration::from_millis(9_900), "got {:?}", second);
        let third = limiter.reserve(RewriterKind::OpenAi);
        assert!(third > Duration::from_millis(19_900), "got {:?}", third);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waits_do_not_fire_together() {
        let limiter = RateLimiter::new(&config(10_000, 60));
        let start = tokio::time::Instant::now();
        tokio::join!(
            limiter.wait(RewriterKind::Hosted),
            limiter.wait(RewriterKind::Hosted)
        );
        assert!(start.elapsed() >= Duration::from_millis(9_900));
        assert_eq!(limiter.request_count(RewriterKind::Hosted), 2);
    }

    #[tokio::test]
    async fn test_local_is_never_throttled() {
        let limiter = RateLimiter::new(&config(10_000, 1));
        limiter.wait(RewriterKind::Local).await;
        limiter.wait(RewriterKind::Local).await;
        assert!(limiter.is_allowed(RewriterKind::Local));
        assert_eq!(limiter.request_count(RewriterKind::Local), 0);
    }
}
