//! Backend connection management
//!
//! One store handle per tier, probed once at startup. A tier whose probe
//! fails is marked degraded and silently skipped at call time; the other
//! tiers keep working. Handles bound every store call with the configured
//! operation timeout, so a hung backend degrades to a miss instead of
//! stalling the caller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};

use crate::backend::{RedisStore, TierStore};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::tier::{CacheTier, TierRegistry};

/// Timeout-bounded handle to one tier's backend store.
#[derive(Clone)]
pub struct TierHandle {
    tier: CacheTier,
    store: Arc<dyn TierStore>,
    op_timeout: Duration,
}

impl TierHandle {
    fn new(tier: CacheTier, store: Arc<dyn TierStore>, op_timeout: Duration) -> Self {
        Self {
            tier,
            store,
            op_timeout,
        }
    }

    /// Bound a store call with the operation timeout.
    async fn bound<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| Error::BackendUnavailable {
                tier: self.tier.to_string(),
                reason: format!("operation timed out after {:?}", self.op_timeout),
            })?
    }

    /// Liveness probe bounded by `timeout` rather than the operation bound.
    pub async fn probe(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.store.ping())
            .await
            .map_err(|_| Error::BackendUnavailable {
                tier: self.tier.to_string(),
                reason: format!("liveness probe timed out after {:?}", timeout),
            })?
    }

    /// Fetch raw bytes for a composite key.
    pub async fn fetch(&self, key: &str) -> Result<Option<Bytes>> {
        self.bound(self.store.fetch(key)).await
    }

    /// Store raw bytes under a composite key.
    pub async fn store(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.bound(self.store.store(key, value, ttl)).await
    }

    /// Remove a composite key.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.bound(self.store.remove(key)).await
    }

    /// Add a member to a tag set and refresh its expiry.
    pub async fn add_tag_member(&self, set_key: &str, member: &str, ttl: Duration) -> Result<()> {
        self.bound(self.store.add_tag_member(set_key, member, ttl))
            .await
    }

    /// Scan one bounded chunk of a tag set.
    pub async fn scan_set(
        &self,
        set_key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>)> {
        self.bound(self.store.scan_set(set_key, cursor, count)).await
    }

    /// Remove a tag set.
    pub async fn remove_set(&self, set_key: &str) -> Result<bool> {
        self.bound(self.store.remove_set(set_key)).await
    }

    /// Wipe the tier's backend.
    pub async fn flush(&self) -> Result<()> {
        self.bound(self.store.flush()).await
    }

    /// Keys currently stored in the tier's backend.
    pub async fn key_count(&self) -> Result<u64> {
        self.bound(self.store.key_count()).await
    }

    /// Memory used by the tier's backend.
    pub async fn memory_used_bytes(&self) -> Result<u64> {
        self.bound(self.store.memory_used_bytes()).await
    }
}

/// Per-tier backend handles with startup liveness probing.
pub struct ConnectionManager {
    handles: [Option<TierHandle>; 4],
}

impl ConnectionManager {
    /// Connect a Redis store per configured tier and probe each once.
    ///
    /// A tier whose connection or probe fails is degraded, not fatal: the
    /// failure is logged and the remaining tiers come up normally.
    pub async fn connect(registry: &TierRegistry, config: &EngineConfig) -> Self {
        let mut stores: HashMap<CacheTier, Arc<dyn TierStore>> = HashMap::new();

        for spec in registry.by_priority() {
            match RedisStore::connect(&spec.backend_id, config.connect_timeout()).await {
                Ok(store) => {
                    stores.insert(spec.tier, Arc::new(store));
                }
                Err(e) => {
                    warn!(tier = %spec.tier, error = %e, "tier backend connection failed; tier degraded");
                }
            }
        }

        Self::from_stores(stores, config).await
    }

    /// Build from pre-constructed stores (tests, local development) and
    /// probe each once.
    pub async fn from_stores(
        stores: HashMap<CacheTier, Arc<dyn TierStore>>,
        config: &EngineConfig,
    ) -> Self {
        let mut handles: [Option<TierHandle>; 4] = [None, None, None, None];

        for tier in CacheTier::ALL {
            let Some(store) = stores.get(&tier) else {
                warn!(tier = %tier, "no backend store configured; tier degraded");
                continue;
            };
            let handle = TierHandle::new(tier, Arc::clone(store), config.operation_timeout());
            match handle.probe(config.connect_timeout()).await {
                Ok(()) => {
                    info!(tier = %tier, "tier backend available");
                    handles[tier.index()] = Some(handle);
                }
                Err(e) => {
                    warn!(tier = %tier, error = %e, "liveness probe failed; tier degraded");
                }
            }
        }

        Self { handles }
    }

    /// Handle for one tier, or `None` if the tier is degraded.
    ///
    /// Never fails; callers treat `None` as "skip this tier."
    pub fn client(&self, tier: CacheTier) -> Option<&TierHandle> {
        self.handles[tier.index()].as_ref()
    }

    /// Whether a tier came up at startup.
    pub fn is_available(&self, tier: CacheTier) -> bool {
        self.handles[tier.index()].is_some()
    }

    /// Tiers that came up at startup.
    pub fn available_tiers(&self) -> Vec<CacheTier> {
        CacheTier::ALL
            .into_iter()
            .filter(|t| self.is_available(*t))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use assert_matches::assert_matches;

    fn all_memory_stores() -> HashMap<CacheTier, Arc<dyn TierStore>> {
        CacheTier::ALL
            .into_iter()
            .map(|t| (t, Arc::new(MemoryStore::new()) as Arc<dyn TierStore>))
            .collect()
    }

    #[tokio::test]
    async fn test_all_tiers_available() {
        let config = EngineConfig::default();
        let manager = ConnectionManager::from_stores(all_memory_stores(), &config).await;

        assert_eq!(manager.available_tiers().len(), 4);
        assert!(manager.client(CacheTier::Hot).is_some());
    }

    #[tokio::test]
    async fn test_failed_probe_degrades_single_tier() {
        let config = EngineConfig::default();
        let mut stores = all_memory_stores();

        let broken = Arc::new(MemoryStore::new());
        broken.set_failing(true);
        stores.insert(CacheTier::Warm, broken as Arc<dyn TierStore>);

        let manager = ConnectionManager::from_stores(stores, &config).await;

        assert!(manager.client(CacheTier::Warm).is_none());
        assert!(manager.client(CacheTier::Hot).is_some());
        assert!(manager.client(CacheTier::Cold).is_some());
        assert_eq!(manager.available_tiers().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_store_degrades_tier() {
        let config = EngineConfig::default();
        let mut stores = all_memory_stores();
        stores.remove(&CacheTier::Predictive);

        let manager = ConnectionManager::from_stores(stores, &config).await;
        assert!(!manager.is_available(CacheTier::Predictive));
        assert_eq!(manager.available_tiers().len(), 3);
    }

    #[tokio::test]
    async fn test_handle_maps_timeout_to_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let handle = TierHandle::new(
            CacheTier::Hot,
            store as Arc<dyn TierStore>,
            Duration::from_millis(50),
        );

        // Injected failure surfaces as a backend error, not a panic
        assert_matches!(handle.fetch("hot:k").await, Err(e) if e.is_degradable());
    }
}
