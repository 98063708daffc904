use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{LimitCounter, LimitError, MemoryCounter, RateLimiter, estimate_rate, window_start};

/// A window boundary near the present, so offsets within tests are exact.
fn aligned_now(window: Duration) -> SystemTime {
    window_start(SystemTime::now(), window)
}

#[test]
fn window_start_truncates_to_window_multiples() {
    let w = Duration::from_secs(60);
    let t = UNIX_EPOCH + Duration::from_secs(3661);
    assert_eq!(window_start(t, w), UNIX_EPOCH + Duration::from_secs(3660));

    // An aligned instant is its own window start.
    let aligned = UNIX_EPOCH + Duration::from_secs(3660);
    assert_eq!(window_start(aligned, w), aligned);
}

#[test]
fn estimate_decays_previous_window_linearly() {
    let w = Duration::from_secs(3600);
    let start = UNIX_EPOCH + Duration::from_secs(36_000);

    // Half the previous window still inside the lookback: 5 * 0.5 + 0 = 2.5
    let halfway = start + Duration::from_secs(1800);
    let rate = estimate_rate(5, 0, halfway, w);
    assert!((rate - 2.5).abs() < f64::EPSILON);

    // At the boundary the previous window counts in full.
    let rate = estimate_rate(4, 2, start, w);
    assert!((rate - 6.0).abs() < f64::EPSILON);
}

#[test]
fn increment_then_get_round_trip() {
    let w = Duration::from_secs(60);
    let counter = MemoryCounter::new(w);
    let t0 = aligned_now(w);
    let previous = t0 - w;

    for _ in 0..4 {
        counter.increment("k", t0, t0).unwrap();
    }
    counter.increment("k", previous, previous).unwrap();

    assert_eq!(counter.get("k", t0, previous).unwrap(), (4, 1));
    assert_eq!(counter.get("missing", t0, previous).unwrap(), (0, 0));
}

#[test]
fn eviction_drops_entries_idle_for_three_windows() {
    let w = Duration::from_secs(60);
    let counter = MemoryCounter::new(w);
    let t0 = aligned_now(w);

    counter.increment("idle", t0, t0 + Duration::from_secs(1)).unwrap();
    assert_eq!(counter.len(), 1);

    // Four windows later another key's increment triggers the sweep.
    let later = t0 + w * 4;
    counter.increment("active", later, later).unwrap();
    assert_eq!(counter.len(), 1);
    assert_eq!(counter.get("idle", t0, t0 - w).unwrap(), (0, 0));
}

#[test]
fn eviction_keeps_entries_updated_within_three_windows() {
    let w = Duration::from_secs(60);
    let counter = MemoryCounter::new(w);
    let t0 = aligned_now(w);

    counter.increment("k", t0, t0).unwrap();
    // Refreshed two windows in, so it is still fresh at sweep time.
    counter.increment("k", t0, t0 + w * 2).unwrap();

    let sweep_at = t0 + w * 4;
    counter.increment("other", sweep_at, sweep_at).unwrap();

    let (current, _) = counter.get("k", t0, t0 - w).unwrap();
    assert_eq!(current, 2);
}

#[test]
fn sequential_requests_hit_the_limit() {
    let w = Duration::from_secs(60);
    let limiter = RateLimiter::new(2, w).unwrap();
    let t0 = aligned_now(w);

    let a = limiter.check("k", t0).unwrap();
    assert!(a.allowed);
    assert_eq!(a.remaining, 1);

    let b = limiter.check("k", t0 + Duration::from_secs(10)).unwrap();
    assert!(b.allowed);
    assert_eq!(b.remaining, 0);

    let c = limiter.check("k", t0 + Duration::from_secs(20)).unwrap();
    assert!(!c.allowed);
    assert_eq!(c.remaining, 0);
    assert_eq!(c.retry_after, Some(w));
    assert_eq!(c.reset, t0 + w);

    // Other identities keep their own bucket.
    let d = limiter.check("other", t0 + Duration::from_secs(20)).unwrap();
    assert!(d.allowed);
}

#[test]
fn remaining_never_increases_within_a_window() {
    let w = Duration::from_secs(60);
    let limiter = RateLimiter::new(5, w).unwrap();
    let t0 = aligned_now(w);

    let mut last = limiter.limit();
    for i in 0..7 {
        let decision = limiter.check("k", t0 + Duration::from_secs(i)).unwrap();
        assert!(decision.remaining <= last);
        last = decision.remaining;
    }
    assert_eq!(last, 0);
}

#[test]
fn previous_window_decays_into_the_next() {
    let w = Duration::from_secs(3600);
    let limiter = RateLimiter::new(5, w).unwrap();
    let t0 = aligned_now(w);

    for _ in 0..5 {
        assert!(limiter.check("k", t0).unwrap().allowed);
    }
    assert!(!limiter.check("k", t0 + Duration::from_secs(10)).unwrap().allowed);

    // Halfway into the next window the burst has decayed to 2.5, which
    // rounds to 3 and leaves room under the limit of 5.
    let halfway = t0 + w + w / 2;
    let decision = limiter.check("k", halfway).unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 1);
}

#[test]
fn fresh_window_with_idle_history_resets_remaining() {
    let w = Duration::from_secs(60);
    let limiter = RateLimiter::new(3, w).unwrap();
    let t0 = aligned_now(w);

    limiter.check("k", t0).unwrap();

    // Two windows later nothing carries over.
    let decision = limiter.check("k", t0 + w * 2).unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.remaining, limiter.limit() - 1);
}

#[test]
fn denied_requests_are_not_counted() {
    let w = Duration::from_secs(60);
    let counter = Arc::new(MemoryCounter::new(w));
    let limiter = RateLimiter::with_counter(1, w, counter.clone()).unwrap();
    let t0 = aligned_now(w);

    assert!(limiter.check("k", t0).unwrap().allowed);
    for i in 1..5 {
        let decision = limiter.check("k", t0 + Duration::from_secs(i)).unwrap();
        assert!(!decision.allowed);
    }

    let (current, _) = counter.get("k", t0, t0 - w).unwrap();
    assert_eq!(current, 1);
}

#[test]
fn rejects_invalid_parameters() {
    assert!(matches!(
        RateLimiter::new(0, Duration::from_secs(60)),
        Err(LimitError::InvalidConfig)
    ));
    assert!(matches!(
        RateLimiter::new(10, Duration::ZERO),
        Err(LimitError::InvalidConfig)
    ));
}

struct FailingCounter;

impl LimitCounter for FailingCounter {
    fn increment(&self, _: &str, _: SystemTime, _: SystemTime) -> Result<(), LimitError> {
        Err(LimitError::Backend("store unavailable".into()))
    }

    fn get(&self, _: &str, _: SystemTime, _: SystemTime) -> Result<(u64, u64), LimitError> {
        Err(LimitError::Backend("store unavailable".into()))
    }
}

#[test]
fn backend_errors_propagate_to_the_caller() {
    let limiter =
        RateLimiter::with_counter(5, Duration::from_secs(60), Arc::new(FailingCounter)).unwrap();
    assert!(matches!(
        limiter.check("k", SystemTime::now()),
        Err(LimitError::Backend(_))
    ));
}
