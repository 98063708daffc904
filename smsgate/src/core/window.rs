//! Window arithmetic for the sliding-window estimate.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Truncates `now` down to a multiple of `window`, giving the start of the
/// fixed window that contains it.
///
/// Instants before the unix epoch are clamped to the epoch. `window` must be
/// non-zero; [`RateLimiter`](super::RateLimiter) enforces this at
/// construction.
pub fn window_start(now: SystemTime, window: Duration) -> SystemTime {
    let since_epoch = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    let window_ns = window.as_nanos();
    let truncated = since_epoch - since_epoch % window_ns;
    UNIX_EPOCH + Duration::from_nanos(truncated as u64)
}

/// Estimates the request rate over the trailing window ending at `now`.
///
/// The previous window's count is weighted by the fraction of it still inside
/// the trailing lookback, and the current window's count is added in full:
///
/// ```text
/// rate = previous * (window - elapsed) / window + current
/// ```
///
/// This is a continuous approximation, not an exact sliding log: bursts near
/// a window boundary can be under- or over-counted.
pub fn estimate_rate(previous: u64, current: u64, now: SystemTime, window: Duration) -> f64 {
    let start = window_start(now, window);
    let elapsed = now.duration_since(start).unwrap_or(Duration::ZERO);
    let window_secs = window.as_secs_f64();
    let weight = (window_secs - elapsed.as_secs_f64()) / window_secs;
    previous as f64 * weight + current as f64
}
