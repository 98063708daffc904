//! # Smsgate rate limiting
//!
//! Sliding-window rate limiting primitives used by the smsgate server for
//! request admission control.
//!
//! ## Overview
//!
//! The limiter counts requests in fixed time windows and blends the current
//! window's count with a linearly decayed share of the previous window's
//! count. This approximates a continuous trailing window with O(1) space per
//! identity, at the cost of some imprecision at window boundaries.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::{Duration, SystemTime};
//! use smsgate::RateLimiter;
//!
//! // 50 requests per identity per minute
//! let limiter = RateLimiter::new(50, Duration::from_secs(60))?;
//!
//! let decision = limiter.check("client:203.0.113.9", SystemTime::now())?;
//! if decision.allowed {
//!     println!("admitted, {} requests left this window", decision.remaining);
//! } else {
//!     println!("over limit, retry in {:?}", decision.retry_after);
//! }
//! # Ok::<(), smsgate::LimitError>(())
//! ```
//!
//! ## Counter backends
//!
//! Counts live behind the [`LimitCounter`] trait. The default
//! [`MemoryCounter`] keeps a mutex-guarded map in process memory and evicts
//! entries that have been idle for three window lengths. A shared external
//! store can be substituted without touching the decision logic:
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use smsgate::{MemoryCounter, RateLimiter};
//!
//! let window = Duration::from_secs(3600);
//! let counter = Arc::new(MemoryCounter::with_capacity(window, 10_000));
//! let limiter = RateLimiter::with_counter(1000, window, counter)?;
//! # Ok::<(), smsgate::LimitError>(())
//! ```
//!
//! ## Thread safety
//!
//! [`RateLimiter`] takes `&self` everywhere and the default counter is
//! internally synchronized, so a limiter wrapped in an `Arc` can be shared
//! across request handlers directly.

pub mod core;

pub use core::{
    CounterEntry, LimitCounter, LimitError, MemoryCounter, RateDecision, RateLimiter,
    estimate_rate, window_start,
};
