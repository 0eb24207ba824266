//! Cache engine orchestration
//!
//! Ties the tier registry, connection manager, codec, access tracker, and
//! metrics together into the public cache API. The engine holds no cached
//! values in process memory and takes no engine-level lock; backends supply
//! the per-key atomic primitives, and the only process-local mutable state
//! is the tracker history and the metric counters.
//!
//! Failure containment is uniform: backend faults, timeouts, and corrupt
//! entries degrade to a miss or no-op. The only errors callers ever see are
//! input-level (unknown tier name, unencodable value) — every caller must
//! already have a correct code path for a miss, so a dead cache only makes
//! the application slower, never broken.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::TierStore;
use crate::codec::{self, CacheValue};
use crate::config::EngineConfig;
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::metrics::{MetricsCollector, PerformanceStats};
use crate::tier::{CacheTier, TierRegistry};
use crate::tracker::AccessTracker;

/// Members fetched per tag-set scan chunk
const TAG_SCAN_CHUNK: usize = 100;

/// Concurrent generator invocations during preload
const PRELOAD_CONCURRENCY: usize = 8;

/// Per-tier size snapshot
#[derive(Debug, Clone, Serialize)]
pub struct TierSizeStats {
    /// Which tier
    pub tier: CacheTier,
    /// Keys currently stored in the tier's backend
    pub key_count: u64,
    /// Memory used by the tier's backend, in bytes
    pub memory_used_bytes: u64,
    /// Whether the tier's backend came up at startup
    pub available: bool,
}

/// Multi-tier, tag-aware cache engine.
///
/// Construct one per process and share it via `Arc`; every operation takes
/// `&self` and is safe to call from concurrent tasks.
pub struct CacheEngine {
    registry: TierRegistry,
    connections: ConnectionManager,
    tracker: AccessTracker,
    metrics: MetricsCollector,
    tag_grace: Duration,
}

impl CacheEngine {
    /// Connect to the configured Redis backends and probe each tier.
    pub async fn connect(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let registry = TierRegistry::from_config(&config);
        let connections = ConnectionManager::connect(&registry, &config).await;
        Ok(Self::assemble(registry, connections, &config))
    }

    /// Build the engine over pre-constructed stores (tests, local
    /// development).
    pub async fn with_stores(
        config: EngineConfig,
        stores: HashMap<CacheTier, Arc<dyn TierStore>>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = TierRegistry::from_config(&config);
        let connections = ConnectionManager::from_stores(stores, &config).await;
        Ok(Self::assemble(registry, connections, &config))
    }

    fn assemble(
        registry: TierRegistry,
        connections: ConnectionManager,
        config: &EngineConfig,
    ) -> Self {
        Self {
            registry,
            connections,
            tracker: AccessTracker::with_window(config.tracker_window()),
            metrics: MetricsCollector::new(),
            tag_grace: config.tag_grace(),
        }
    }

    /// Tier registry backing this engine.
    pub fn registry(&self) -> &TierRegistry {
        &self.registry
    }

    /// Tiers whose backends came up at startup.
    pub fn available_tiers(&self) -> Vec<CacheTier> {
        self.connections.available_tiers()
    }

    /// Look up a logical key.
    ///
    /// Searches the given tiers in the given order, or all tiers in
    /// priority-descending order when `tiers` is `None`. A hit in any tier
    /// below the highest-priority one is promoted there best-effort. Every
    /// backend fault is contained: the worst outcome is `None`.
    pub async fn get(&self, key: &str, tiers: Option<&[CacheTier]>) -> Option<CacheValue> {
        self.tracker.record(key);

        let lookup: Vec<CacheTier> = match tiers {
            Some(subset) => subset.to_vec(),
            None => self.registry.by_priority().map(|s| s.tier).collect(),
        };

        for tier in lookup {
            let Some(handle) = self.connections.client(tier) else {
                continue;
            };

            let composite = tier.composite_key(key);
            let raw = match handle.fetch(&composite).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    debug!(%tier, key, error = %e, "tier fetch failed; treating as miss");
                    continue;
                }
            };

            match codec::decode(&raw) {
                Ok(value) => {
                    self.metrics.record_hit(tier);
                    if tier != self.registry.highest() {
                        self.promote(key, &value, tier).await;
                    }
                    return Some(value);
                }
                Err(e) => {
                    // Corrupt entry: per-tier miss, left to TTL expiry
                    warn!(%tier, key, error = %e, "undecodable cache entry; treating as miss");
                    continue;
                }
            }
        }

        self.metrics.record_miss();
        None
    }

    /// Copy a value hit in a lower tier into the highest-priority tier.
    ///
    /// Best-effort: concurrent promotions are idempotent last-write-wins,
    /// and a failure never reaches the caller already holding the value.
    async fn promote(&self, key: &str, value: &CacheValue, from: CacheTier) {
        let target = self.registry.highest();
        let Some(handle) = self.connections.client(target) else {
            return;
        };

        let raw = match codec::encode(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "promotion encode failed");
                return;
            }
        };

        let composite = target.composite_key(key);
        match handle.store(&composite, raw, self.registry.ttl(target)).await {
            Ok(()) => debug!(key, from = %from, to = %target, "promoted entry"),
            Err(e) => warn!(key, from = %from, to = %target, error = %e, "promotion failed"),
        }
    }

    /// Store a value in one tier, optionally tagging it.
    ///
    /// Encoding failure is the only error; a backend fault degrades to
    /// `Ok(false)`. Tag bookkeeping is best-effort and never fails a
    /// successful primary write.
    pub async fn set(
        &self,
        key: &str,
        value: &CacheValue,
        tier: CacheTier,
        tags: &[&str],
    ) -> Result<bool> {
        let raw = codec::encode(value)?;

        let Some(handle) = self.connections.client(tier) else {
            warn!(%tier, key, "tier degraded; cache write dropped");
            return Ok(false);
        };

        let composite = tier.composite_key(key);
        let ttl = self.registry.ttl(tier);
        if let Err(e) = handle.store(&composite, raw, ttl).await {
            warn!(%tier, key, error = %e, "cache write failed");
            return Ok(false);
        }

        let tag_ttl = ttl + self.tag_grace;
        for tag in tags {
            let set_key = tier.tag_set_key(tag);
            if let Err(e) = handle.add_tag_member(&set_key, &composite, tag_ttl).await {
                warn!(%tier, key, tag = *tag, error = %e, "tag bookkeeping failed");
            }
        }

        Ok(true)
    }

    /// Remove a logical key from the given tiers (all tiers when `None`).
    ///
    /// Returns whether at least one removal occurred. Absence everywhere is
    /// not an error, and per-tier faults are no-ops.
    pub async fn delete(&self, key: &str, tiers: Option<&[CacheTier]>) -> bool {
        let scope: Vec<CacheTier> = match tiers {
            Some(subset) => subset.to_vec(),
            None => self.registry.by_priority().map(|s| s.tier).collect(),
        };

        let mut removed = false;
        for tier in scope {
            let Some(handle) = self.connections.client(tier) else {
                continue;
            };
            match handle.remove(&tier.composite_key(key)).await {
                Ok(true) => removed = true,
                Ok(false) => {}
                Err(e) => debug!(%tier, key, error = %e, "delete failed; treating as no-op"),
            }
        }
        removed
    }

    /// Remove every key tagged with `tag`, across all tiers.
    ///
    /// Tag sets are enumerated in bounded chunks, so an arbitrarily large
    /// tag never materializes as one list. Per-tier faults reduce the
    /// returned count but do not abort the remaining tiers.
    pub async fn invalidate_by_tag(&self, tag: &str) -> u64 {
        let mut invalidated = 0u64;

        for spec in self.registry.by_priority() {
            let tier = spec.tier;
            let Some(handle) = self.connections.client(tier) else {
                continue;
            };
            let set_key = tier.tag_set_key(tag);

            let mut cursor = 0u64;
            loop {
                let (next, members) = match handle.scan_set(&set_key, cursor, TAG_SCAN_CHUNK).await
                {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(%tier, tag, error = %e, "tag scan failed; skipping rest of tier");
                        break;
                    }
                };

                for member in members {
                    match handle.remove(&member).await {
                        Ok(true) => invalidated += 1,
                        Ok(false) => {}
                        Err(e) => debug!(%tier, %member, error = %e, "tagged delete failed"),
                    }
                }

                if next == 0 {
                    break;
                }
                cursor = next;
            }

            if let Err(e) = handle.remove_set(&set_key).await {
                debug!(%tier, tag, error = %e, "tag set delete failed");
            }
        }

        debug!(tag, invalidated, "tag invalidation complete");
        invalidated
    }

    /// Warm a batch of keys into a tier (`Predictive` when `None`).
    ///
    /// Keys already present in the target tier are skipped. A generator
    /// failure for one key is logged and skipped; it never aborts the rest
    /// of the batch.
    pub async fn preload<F, Fut>(&self, keys: &[String], generator: F, tier: Option<CacheTier>)
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<CacheValue>>,
    {
        let tier = tier.unwrap_or(CacheTier::Predictive);
        let Some(handle) = self.connections.client(tier) else {
            warn!(%tier, "tier degraded; preload skipped");
            return;
        };

        let generator = &generator;
        stream::iter(keys.iter().cloned())
            .for_each_concurrent(PRELOAD_CONCURRENCY, |key| async move {
                match handle.fetch(&tier.composite_key(&key)).await {
                    Ok(Some(_)) => return,
                    Ok(None) => {}
                    Err(e) => {
                        debug!(%tier, %key, error = %e, "preload presence check failed");
                    }
                }

                let value = match generator(key.clone()).await {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(%key, error = %e, "preload generator failed; skipping key");
                        return;
                    }
                };

                match self.set(&key, &value, tier, &[]).await {
                    Ok(true) => debug!(%tier, %key, "preloaded"),
                    Ok(false) => warn!(%tier, %key, "preload write dropped"),
                    Err(e) => warn!(%key, error = %e, "preload encode failed; skipping key"),
                }
            })
            .await;
    }

    /// Wipe one tier's backend. Maintenance only; irreversible.
    pub async fn flush_tier(&self, tier: CacheTier) -> bool {
        let Some(handle) = self.connections.client(tier) else {
            warn!(%tier, "tier degraded; flush skipped");
            return false;
        };

        match handle.flush().await {
            Ok(()) => {
                info!(%tier, at = %chrono::Utc::now().to_rfc3339(), "tier flushed");
                true
            }
            Err(e) => {
                warn!(%tier, error = %e, "tier flush failed");
                false
            }
        }
    }

    /// Hit-rate snapshot.
    pub fn performance_stats(&self) -> PerformanceStats {
        self.metrics.stats()
    }

    /// Per-tier key counts and memory usage.
    ///
    /// A degraded tier reports zeros with `available: false`; a runtime
    /// fault on a live tier degrades to zeros as well.
    pub async fn size_stats(&self) -> Vec<TierSizeStats> {
        let mut stats = Vec::with_capacity(CacheTier::ALL.len());
        for spec in self.registry.by_priority() {
            let tier = spec.tier;
            match self.connections.client(tier) {
                Some(handle) => stats.push(TierSizeStats {
                    tier,
                    key_count: handle.key_count().await.unwrap_or_default(),
                    memory_used_bytes: handle.memory_used_bytes().await.unwrap_or_default(),
                    available: true,
                }),
                None => stats.push(TierSizeStats {
                    tier,
                    key_count: 0,
                    memory_used_bytes: 0,
                    available: false,
                }),
            }
        }
        stats
    }

    /// Accesses recorded for a key within `window` (hotness signal for
    /// external preload schedulers).
    pub fn access_count(&self, key: &str, window: Duration) -> usize {
        self.tracker.access_count(key, window)
    }
}

// =============================================================================
// Tests
// =============================================================================
