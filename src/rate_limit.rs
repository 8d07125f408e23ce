//! Adaptive rate limiting with jitter and capped exponential backoff.
//!
//! Every request waits a randomized base delay; consecutive failures widen
//! the delay exponentially (capped), success snaps it back to baseline.
//! A crawl-delay declared by the origin raises the baseline floor and is
//! never lowered again.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

/// Exponent cap: failures beyond this many stop widening the delay.
pub const BACKOFF_CAP: u32 = 5;

#[derive(Debug)]
struct RateState {
    last_request: Option<Instant>,
    consecutive_errors: u32,
    min_delay: Duration,
    max_delay: Duration,
}

/// Enforces randomized inter-request spacing with exponential backoff.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<RateState>,
}

/// Backoff multiplier for a given consecutive-error count.
fn backoff_multiplier(consecutive_errors: u32) -> u32 {
    2u32.pow(consecutive_errors.min(BACKOFF_CAP))
}

impl RateLimiter {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            state: Mutex::new(RateState {
                last_request: None,
                consecutive_errors: 0,
                min_delay,
                max_delay,
            }),
        }
    }

    /// Block until enough time has passed since the previous request,
    /// then mark the request as started.
    pub async fn wait(&self) {
        let sleep_time = {
            let state = self.state.lock().await;
            let base = random_delay(state.min_delay, state.max_delay);
            let effective = base * backoff_multiplier(state.consecutive_errors);

            if state.consecutive_errors > 0 {
                debug!(
                    "Backing off: {} consecutive errors, effective delay {:?}",
                    state.consecutive_errors, effective
                );
            }

            match state.last_request {
                Some(last) => effective.saturating_sub(last.elapsed()),
                // First request goes out immediately
                None => Duration::ZERO,
            }
        };

        if sleep_time > Duration::ZERO {
            tokio::time::sleep(sleep_time).await;
        }

        self.state.lock().await.last_request = Some(Instant::now());
    }

    /// A request succeeded; drop back to the baseline delay.
    pub async fn record_success(&self) {
        self.state.lock().await.consecutive_errors = 0;
    }

    /// A request failed; widen the next delay.
    pub async fn record_error(&self) {
        self.state.lock().await.consecutive_errors += 1;
    }

    /// Raise the delay bounds to at least `floor`. Never lowers them.
    pub async fn raise_floor(&self, floor: Duration) {
        let mut state = self.state.lock().await;
        if floor > state.min_delay {
            debug!("Raising rate limit floor to {:?}", floor);
            state.min_delay = floor;
        }
        if state.min_delay > state.max_delay {
            state.max_delay = state.min_delay;
        }
    }

    /// Current consecutive-error count.
    pub async fn consecutive_errors(&self) -> u32 {
        self.state.lock().await.consecutive_errors
    }

    /// Current delay bounds.
    pub async fn delay_bounds(&self) -> (Duration, Duration) {
        let state = self.state.lock().await;
        (state.min_delay, state.max_delay)
    }
}

/// Uniform random duration in `[min, max]`.
fn random_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let secs = rand::rng().random_range(min.as_secs_f64()..=max.as_secs_f64());
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_grows_then_caps() {
        assert_eq!(backoff_multiplier(0), 1);
        assert_eq!(backoff_multiplier(1), 2);
        assert_eq!(backoff_multiplier(3), 8);
        assert_eq!(backoff_multiplier(5), 32);
        // Effect is capped even though the counter keeps climbing
        assert_eq!(backoff_multiplier(6), 32);
        assert_eq!(backoff_multiplier(100), 32);
    }

    #[test]
    fn test_multiplier_monotone_up_to_cap() {
        for errors in 0..BACKOFF_CAP {
            assert!(backoff_multiplier(errors) <= backoff_multiplier(errors + 1));
        }
    }

    #[test]
    fn test_random_delay_within_bounds() {
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(300);
        for _ in 0..50 {
            let d = random_delay(min, max);
            assert!(d >= min && d <= max);
        }
    }

    #[tokio::test]
    async fn test_success_resets_error_count() {
        let limiter = RateLimiter::new(Duration::from_millis(1), Duration::from_millis(2));
        limiter.record_error().await;
        limiter.record_error().await;
        assert_eq!(limiter.consecutive_errors().await, 2);
        limiter.record_success().await;
        assert_eq!(limiter.consecutive_errors().await, 0);
    }

    #[tokio::test]
    async fn test_raise_floor_never_lowers() {
        let limiter = RateLimiter::new(Duration::from_secs(1), Duration::from_secs(3));
        limiter.raise_floor(Duration::from_secs(2)).await;
        assert_eq!(
            limiter.delay_bounds().await,
            (Duration::from_secs(2), Duration::from_secs(3))
        );

        // Lower floor is a no-op
        limiter.raise_floor(Duration::from_millis(500)).await;
        assert_eq!(
            limiter.delay_bounds().await,
            (Duration::from_secs(2), Duration::from_secs(3))
        );
    }

    #[tokio::test]
    async fn test_raise_floor_above_max_lifts_max() {
        let limiter = RateLimiter::new(Duration::from_secs(1), Duration::from_secs(3));
        limiter.raise_floor(Duration::from_secs(10)).await;
        assert_eq!(
            limiter.delay_bounds().await,
            (Duration::from_secs(10), Duration::from_secs(10))
        );
    }

    #[tokio::test]
    async fn test_first_wait_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(5), Duration::from_secs(10));
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_wait_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_secs(2), Duration::from_secs(2));
        limiter.wait().await;
        let start = tokio::time::Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
