//! STOP request tracking.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Sender/recipient pairs that opted out via STOP, kept until their entry
/// expires.
pub struct StopList {
    ttl: Duration,
    entries: Mutex<HashMap<(String, String), SystemTime>>,
}

impl StopList {
    pub fn new(ttl: Duration) -> Self {
        StopList {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks the (from, to) pair for the configured lifetime, refreshing
    /// any existing entry. Lapsed entries are pruned along the way.
    pub fn block(&self, from: &str, to: &str, now: SystemTime) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, expiry| *expiry > now);
        entries.insert((from.to_string(), to.to_string()), now + self.ttl);
    }

    /// Whether the (from, to) pair has an unexpired STOP entry.
    pub fn is_blocked(&self, from: &str, to: &str, now: SystemTime) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(from.to_string(), to.to_string()))
            .is_some_and(|expiry| *expiry > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_the_ttl() {
        let ttl = Duration::from_secs(4 * 3600);
        let list = StopList::new(ttl);
        let now = SystemTime::now();

        list.block("14155550100", "14155550123", now);
        assert!(list.is_blocked("14155550100", "14155550123", now));
        assert!(list.is_blocked("14155550100", "14155550123", now + ttl - Duration::from_secs(1)));
        assert!(!list.is_blocked("14155550100", "14155550123", now + ttl));

        // Direction matters.
        assert!(!list.is_blocked("14155550123", "14155550100", now));
    }

    #[test]
    fn blocking_refreshes_and_prunes() {
        let ttl = Duration::from_secs(60);
        let list = StopList::new(ttl);
        let now = SystemTime::now();

        list.block("14155550100", "14155550123", now);

        // Re-blocking later pushes the expiry out and drops lapsed entries.
        let later = now + Duration::from_secs(90);
        list.block("14155550100", "14155550123", later);
        assert!(list.is_blocked("14155550100", "14155550123", later + Duration::from_secs(59)));

        list.block("14155550777", "14155550888", later + ttl + Duration::from_secs(1));
        assert!(!list.is_blocked("14155550100", "14155550123", later + ttl + Duration::from_secs(1)));
    }
}
