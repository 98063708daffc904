pub mod counter;
pub mod limiter;
pub mod window;

#[cfg(test)]
mod tests;

pub use counter::{CounterEntry, LimitCounter, MemoryCounter};
pub use limiter::{RateDecision, RateLimiter};
pub use window::{estimate_rate, window_start};

#[derive(Debug, thiserror::Error)]
pub enum LimitError {
    /// Request limit or window length outside the valid range.
    #[error("invalid rate limit parameters")]
    InvalidConfig,

    /// Failure reported by the counter backend.
    #[error("counter backend error: {0}")]
    Backend(String),
}
