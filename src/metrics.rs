//! Cache performance metrics
//!
//! Per-tier hit counters and a single global miss counter. Process-local,
//! reset on restart; a miss is only recorded after every tier in the lookup
//! order has come up empty.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::tier::CacheTier;

/// Metrics collector for the cache engine
#[derive(Debug, Default)]
pub struct MetricsCollector {
    hits: [AtomicU64; 4],
    misses: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit in one tier.
    pub fn record_hit(&self, tier: CacheTier) {
        self.hits[tier.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Record a full miss (no tier yielded a value).
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Hits recorded for one tier.
    pub fn hits(&self, tier: CacheTier) -> u64 {
        self.hits[tier.index()].load(Ordering::Relaxed)
    }

    /// Total hits across all tiers.
    pub fn total_hits(&self) -> u64 {
        CacheTier::ALL.into_iter().map(|t| self.hits(t)).sum()
    }

    /// Full misses recorded.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Snapshot of the current counters.
    pub fn stats(&self) -> PerformanceStats {
        let hits = self.total_hits();
        let misses = self.misses();
        let total = hits + misses;
        let hit_rate_percent = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64 * 100.0
        };

        PerformanceStats {
            hit_rate_percent,
            total_requests: total,
            hits,
            misses,
            tier_breakdown: CacheTier::ALL
                .into_iter()
                .map(|tier| TierHits {
                    tier,
                    hits: self.hits(tier),
                })
                .collect(),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in &self.hits {
            counter.store(0, Ordering::Relaxed);
        }
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Hit count for one tier
#[derive(Debug, Clone, Serialize)]
pub struct TierHits {
    /// Which tier
    pub tier: CacheTier,
    /// Hits recorded in that tier
    pub hits: u64,
}

/// Snapshot of cache performance counters
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    /// Hit rate as a percentage of all requests
    pub hit_rate_percent: f64,
    /// Hits plus misses
    pub total_requests: u64,
    /// Total hits across tiers
    pub hits: u64,
    /// Full misses
    pub misses: u64,
    /// Per-tier hit counts
    pub tier_breakdown: Vec<TierHits>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let metrics = MetricsCollector::new();
        let stats = metrics.stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.hit_rate_percent, 0.0);
    }

    #[test]
    fn test_hit_rate_math() {
        let metrics = MetricsCollector::new();

        metrics.record_hit(CacheTier::Hot);
        metrics.record_hit(CacheTier::Hot);
        metrics.record_hit(CacheTier::Cold);
        metrics.record_miss();

        let stats = metrics.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_requests, 4);
        assert!((stats.hit_rate_percent - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tier_breakdown() {
        let metrics = MetricsCollector::new();

        metrics.record_hit(CacheTier::Warm);
        metrics.record_hit(CacheTier::Warm);
        metrics.record_hit(CacheTier::Predictive);

        let stats = metrics.stats();
        let warm = stats
            .tier_breakdown
            .iter()
            .find(|t| t.tier == CacheTier::Warm)
            .unwrap();
        assert_eq!(warm.hits, 2);
        let hot = stats
            .tier_breakdown
            .iter()
            .find(|t| t.tier == CacheTier::Hot)
            .unwrap();
        assert_eq!(hot.hits, 0);
    }

    #[test]
    fn test_reset() {
        let metrics = MetricsCollector::new();
        metrics.record_hit(CacheTier::Hot);
        metrics.record_miss();

        metrics.reset();
        let stats = metrics.stats();
        assert_eq!(stats.total_requests, 0);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;

        let metrics = Arc::new(MetricsCollector::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let metrics = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1_000 {
                    metrics.record_hit(CacheTier::Hot);
                    metrics.record_miss();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.hits(CacheTier::Hot), 8_000);
        assert_eq!(metrics.misses(), 8_000);
    }
}
