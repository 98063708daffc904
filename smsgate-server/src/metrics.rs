//! Simple metrics collection for observability
//!
//! Lightweight atomic counters with minimal overhead in the hot path,
//! exported in Prometheus text format.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Core metrics collected by the server
pub struct Metrics {
    /// Server start time
    start_time: Instant,

    /// Total requests evaluated by the limiter
    pub total_requests: AtomicU64,

    /// Admission decisions
    pub requests_allowed: AtomicU64,
    pub requests_denied: AtomicU64,
    pub requests_errors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            requests_allowed: AtomicU64::new(0),
            requests_denied: AtomicU64::new(0),
            requests_errors: AtomicU64::new(0),
        }
    }

    /// Record an admitted request
    pub fn record_allowed(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_allowed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request rejected by the limiter
    pub fn record_denied(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that failed before a decision was reached
    pub fn record_error(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::with_capacity(600);

        output.push_str("# HELP smsgate_uptime_seconds Time since server start in seconds\n");
        output.push_str("# TYPE smsgate_uptime_seconds gauge\n");
        output.push_str(&format!(
            "smsgate_uptime_seconds {}\n\n",
            self.uptime_seconds()
        ));

        output.push_str("# HELP smsgate_requests_total Total number of requests evaluated\n");
        output.push_str("# TYPE smsgate_requests_total counter\n");
        output.push_str(&format!(
            "smsgate_requests_total {}\n\n",
            self.total_requests.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP smsgate_requests_by_decision Requests by admission decision\n");
        output.push_str("# TYPE smsgate_requests_by_decision counter\n");
        output.push_str(&format!(
            "smsgate_requests_by_decision{{decision=\"allowed\"}} {}\n",
            self.requests_allowed.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "smsgate_requests_by_decision{{decision=\"denied\"}} {}\n",
            self.requests_denied.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "smsgate_requests_by_decision{{decision=\"error\"}} {}\n",
            self.requests_errors.load(Ordering::Relaxed)
        ));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
