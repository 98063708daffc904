//! Counter storage for the rate limiter.

use std::hash::BuildHasher;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ahash::{AHashMap, RandomState};

use super::LimitError;

// Sweep cadence and staleness horizon, in window lengths.
const EVICTION_WINDOWS: u32 = 3;

/// Storage backend for per-identity, per-window request counts.
///
/// The local [`MemoryCounter`] never fails; the error channel exists so that
/// alternative backends (a shared external cache, for instance) can surface
/// I/O problems without changing the limiter.
pub trait LimitCounter: Send + Sync {
    /// Adds one request to the counter for `key` in the window starting at
    /// `window_start`, creating the entry if absent, and stamps it with
    /// `now`.
    fn increment(
        &self,
        key: &str,
        window_start: SystemTime,
        now: SystemTime,
    ) -> Result<(), LimitError>;

    /// Returns the counts for the current and previous windows, zero for
    /// either window without an entry.
    fn get(
        &self,
        key: &str,
        current_start: SystemTime,
        previous_start: SystemTime,
    ) -> Result<(u64, u64), LimitError>;
}

/// A single window's count and the time it was last touched.
#[derive(Debug, Clone, Copy)]
pub struct CounterEntry {
    pub value: u64,
    pub last_updated: SystemTime,
}

/// Process-local counter store.
///
/// One mutex guards a map from hashed (identity, window start) pairs to
/// [`CounterEntry`] values. The hot path is an O(1) map access, so a single
/// lock favoring correctness over throughput is acceptable.
///
/// Eviction is opportunistic rather than timer-driven: whenever an increment
/// finds that three window lengths have passed since the last sweep, it scans
/// the whole map and drops entries idle for three window lengths or more.
/// Memory stays bounded by the set of identities active within the last three
/// windows, at the cost of an occasional O(n) pause for whichever request
/// triggers the sweep.
pub struct MemoryCounter {
    window: Duration,
    hasher: RandomState,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: AHashMap<u64, CounterEntry>,
    last_sweep: SystemTime,
}

impl MemoryCounter {
    /// Creates a counter store for the given window length.
    pub fn new(window: Duration) -> Self {
        Self::with_capacity(window, 0)
    }

    /// Creates a counter store pre-sized for `capacity` identities.
    pub fn with_capacity(window: Duration, capacity: usize) -> Self {
        MemoryCounter {
            window,
            hasher: RandomState::new(),
            inner: Mutex::new(Inner {
                entries: AHashMap::with_capacity(capacity),
                last_sweep: SystemTime::now(),
            }),
        }
    }

    /// Number of live entries, across all windows.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn window_key(&self, key: &str, window_start: SystemTime) -> u64 {
        let nanos = window_start
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos() as u64;
        self.hasher.hash_one((key, nanos))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, LimitError> {
        self.inner
            .lock()
            .map_err(|_| LimitError::Backend("counter lock poisoned".into()))
    }
}

impl Inner {
    fn maybe_sweep(&mut self, window: Duration, now: SystemTime) {
        let horizon = window * EVICTION_WINDOWS;
        let due = now
            .duration_since(self.last_sweep)
            .is_ok_and(|since| since >= horizon);
        if !due {
            return;
        }
        self.last_sweep = now;
        self.entries.retain(|_, entry| {
            now.duration_since(entry.last_updated)
                .is_ok_and(|idle| idle < horizon)
                || entry.last_updated > now
        });
    }
}

impl LimitCounter for MemoryCounter {
    fn increment(
        &self,
        key: &str,
        window_start: SystemTime,
        now: SystemTime,
    ) -> Result<(), LimitError> {
        let hashed = self.window_key(key, window_start);
        let mut inner = self.lock()?;
        inner.maybe_sweep(self.window, now);
        let entry = inner.entries.entry(hashed).or_insert(CounterEntry {
            value: 0,
            last_updated: now,
        });
        entry.value += 1;
        entry.last_updated = now;
        Ok(())
    }

    fn get(
        &self,
        key: &str,
        current_start: SystemTime,
        previous_start: SystemTime,
    ) -> Result<(u64, u64), LimitError> {
        let current_key = self.window_key(key, current_start);
        let previous_key = self.window_key(key, previous_start);
        let inner = self.lock()?;
        let current = inner.entries.get(&current_key).map_or(0, |e| e.value);
        let previous = inner.entries.get(&previous_key).map_or(0, |e| e.value);
        Ok((current, previous))
    }
}
