//! Admission decisions over a counter backend.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::LimitError;
use super::counter::{LimitCounter, MemoryCounter};
use super::window::{estimate_rate, window_start};

/// Outcome of a rate limit check for one request.
#[derive(Debug, Clone)]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The configured request limit per window.
    pub limit: u64,
    /// Requests left in the current window after this one, zero when denied.
    pub remaining: u64,
    /// Start of the next window, when the current bucket resets.
    pub reset: SystemTime,
    /// How long a denied caller should wait; `None` when allowed.
    pub retry_after: Option<Duration>,
}

/// Sliding-window request limiter.
///
/// Stateless across requests apart from the shared counter backend; clone the
/// surrounding `Arc` to share one limiter between handlers.
pub struct RateLimiter {
    limit: u64,
    window: Duration,
    counter: Arc<dyn LimitCounter>,
}

impl RateLimiter {
    /// Creates a limiter backed by a process-local [`MemoryCounter`].
    ///
    /// Fails with [`LimitError::InvalidConfig`] unless `limit` and `window`
    /// are both positive.
    pub fn new(limit: u64, window: Duration) -> Result<Self, LimitError> {
        Self::with_counter(limit, window, Arc::new(MemoryCounter::new(window)))
    }

    /// Creates a limiter over a caller-supplied counter backend.
    pub fn with_counter(
        limit: u64,
        window: Duration,
        counter: Arc<dyn LimitCounter>,
    ) -> Result<Self, LimitError> {
        if limit == 0 || window.is_zero() {
            return Err(LimitError::InvalidConfig);
        }
        Ok(RateLimiter {
            limit,
            window,
            counter,
        })
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Estimated request rate for `key` over the trailing window, without
    /// admitting anything.
    pub fn status(&self, key: &str, now: SystemTime) -> Result<f64, LimitError> {
        let current_start = window_start(now, self.window);
        let previous_start = current_start - self.window;
        let (current, previous) = self.counter.get(key, current_start, previous_start)?;
        Ok(estimate_rate(previous, current, now, self.window))
    }

    /// Decides whether one request for `key` at `now` is admitted, and
    /// records it against the current window if so.
    ///
    /// The read and the increment take the counter lock separately, so two
    /// concurrent requests for the same key can both observe a rate below the
    /// limit and both be admitted. Enforcement is approximate by that margin;
    /// it is not a hard per-window guarantee.
    pub fn check(&self, key: &str, now: SystemTime) -> Result<RateDecision, LimitError> {
        let current_start = window_start(now, self.window);
        let reset = current_start + self.window;

        let rate = self.status(key, now)?;
        let observed = rate.round() as u64;

        if observed >= self.limit {
            return Ok(RateDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset,
                retry_after: Some(self.window),
            });
        }

        self.counter.increment(key, current_start, now)?;

        Ok(RateDecision {
            allowed: true,
            limit: self.limit,
            // The request just admitted counts against the window too.
            remaining: self.limit - observed - 1,
            reset,
            retry_after: None,
        })
    }
}
