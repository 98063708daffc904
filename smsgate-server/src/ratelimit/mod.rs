//! HTTP admission control.
//!
//! Wires the smsgate sliding-window limiter into a tower middleware layer:
//! key extraction strategies derive a caller identity from each request, the
//! limiter decides, and the layer emits the `X-RateLimit-*` headers or the
//! rejection response.

pub mod key;
pub mod middleware;


pub use key::{KeyError, KeyFn, canonical_ip, key_by_ip, key_by_path, key_by_sender};
pub use middleware::{LimitHandler, RateLimitBuilder, RateLimitLayer, RateLimitService};
