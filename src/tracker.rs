//! Access tracking
//!
//! Per-key access history over a trailing window, used as a hotness signal
//! by external preload schedulers. History is trimmed lazily on each record
//! call; there is no background sweep. State is striped across DashMap
//! shards, so concurrent `get`s on different keys never contend.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default trailing window for access history
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3_600);

/// Records per-key access timestamps in a trailing window.
pub struct AccessTracker {
    window: Duration,
    history: DashMap<String, Vec<Instant>>,
}

impl AccessTracker {
    /// Create a tracker with the default 1-hour window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Create a tracker with a custom trailing window.
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            history: DashMap::new(),
        }
    }

    /// Record an access for a logical key, trimming entries that have
    /// fallen out of the trailing window.
    pub fn record(&self, key: &str) {
        let now = Instant::now();
        let mut accesses = self.history.entry(key.to_string()).or_default();
        accesses.retain(|&at| now.duration_since(at) <= self.window);
        accesses.push(now);
    }

    /// Number of accesses for a key within the most recent `window`.
    ///
    /// The requested window is clamped to the tracker's trailing window,
    /// since older entries have already been trimmed.
    pub fn access_count(&self, key: &str, window: Duration) -> usize {
        let window = window.min(self.window);
        let now = Instant::now();
        self.history
            .get(key)
            .map(|accesses| {
                accesses
                    .iter()
                    .filter(|&&at| now.duration_since(at) <= window)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Number of keys with any recorded history.
    pub fn tracked_keys(&self) -> usize {
        self.history.len()
    }
}

impl Default for AccessTracker {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let tracker = AccessTracker::new();

        tracker.record("market_data:4151");
        tracker.record("market_data:4151");
        tracker.record("market_data:4151");
        tracker.record("market_data:2");

        assert_eq!(
            tracker.access_count("market_data:4151", Duration::from_secs(60)),
            3
        );
        assert_eq!(tracker.access_count("market_data:2", Duration::from_secs(60)), 1);
        assert_eq!(tracker.access_count("unseen", Duration::from_secs(60)), 0);
        assert_eq!(tracker.tracked_keys(), 2);
    }

    #[test]
    fn test_lazy_trim_drops_old_entries() {
        let tracker = AccessTracker::with_window(Duration::from_millis(30));

        tracker.record("k");
        std::thread::sleep(Duration::from_millis(60));
        // This record trims the stale entry before appending
        tracker.record("k");

        assert_eq!(tracker.access_count("k", Duration::from_secs(60)), 1);
    }

    #[test]
    fn test_narrow_window_count() {
        let tracker = AccessTracker::new();

        tracker.record("k");
        std::thread::sleep(Duration::from_millis(50));
        tracker.record("k");

        assert_eq!(tracker.access_count("k", Duration::from_secs(60)), 2);
        // Only the most recent access falls inside a 20ms window
        assert_eq!(tracker.access_count("k", Duration::from_millis(20)), 1);
    }

    #[test]
    fn test_concurrent_records() {
        use std::sync::Arc;

        let tracker = Arc::new(AccessTracker::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let tracker = Arc::clone(&tracker);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    tracker.record(&format!("key-{}", i % 10));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let total: usize = (0..10)
            .map(|i| tracker.access_count(&format!("key-{}", i), Duration::from_secs(60)))
            .sum();
        assert_eq!(total, 800);
    }
}
