//! In-memory tier store
//!
//! DashMap-backed store with per-entry expiry, used by tests and local
//! development. Expired entries are dropped lazily on read. Supports
//! failure injection so degradation paths can be exercised without a real
//! backend outage.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::TierStore;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct StoredEntry {
    data: Bytes,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct StoredSet {
    // BTreeSet keeps scan order stable across chunked calls
    members: BTreeSet<String>,
    expires_at: Instant,
}

/// In-memory tier store for testing
pub struct MemoryStore {
    entries: DashMap<String, StoredEntry>,
    sets: DashMap<String, StoredSet>,
    /// When set, every operation fails as if the backend were unreachable
    failing: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            sets: DashMap::new(),
            failing: AtomicBool::new(false),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle failure injection: while failing, every operation errors.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Operation statistics
    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(Error::Backend("injected backend failure".to_string()));
        }
        Ok(())
    }
}

/// Operation counters for assertions in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreStats {
    /// Read operations
    pub reads: u64,
    /// Write operations
    pub writes: u64,
    /// Delete operations
    pub deletes: u64,
}

#[async_trait]
impl TierStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    async fn fetch(&self, key: &str) -> Result<Option<Bytes>> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.data.clone()));
            }
        } else {
            return Ok(None);
        }
        // Lazy expiry
        self.entries.remove(key);
        Ok(None)
    }

    async fn store(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        self.entries.insert(
            key.to_string(),
            StoredEntry {
                data: value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.check_available()?;
        self.deletes.fetch_add(1, Ordering::Relaxed);

        Ok(self.entries.remove(key).is_some())
    }

    async fn add_tag_member(&self, set_key: &str, member: &str, ttl: Duration) -> Result<()> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        let mut set = self.sets.entry(set_key.to_string()).or_insert_with(|| StoredSet {
            members: BTreeSet::new(),
            expires_at: Instant::now() + ttl,
        });
        set.members.insert(member.to_string());
        // Last writer wins on the set expiry
        set.expires_at = Instant::now() + ttl;
        Ok(())
    }

    async fn scan_set(
        &self,
        set_key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>)> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        if let Some(set) = self.sets.get(set_key) {
            if set.expires_at > now {
                let members: Vec<String> = set
                    .members
                    .iter()
                    .skip(cursor as usize)
                    .take(count)
                    .cloned()
                    .collect();
                let consumed = cursor as usize + members.len();
                let next_cursor = if consumed >= set.members.len() {
                    0
                } else {
                    consumed as u64
                };
                return Ok((next_cursor, members));
            }
        } else {
            return Ok((0, Vec::new()));
        }

        // Lazy expiry; the read guard above has been released
        self.sets.remove(set_key);
        Ok((0, Vec::new()))
    }

    async fn remove_set(&self, set_key: &str) -> Result<bool> {
        self.check_available()?;
        self.deletes.fetch_add(1, Ordering::Relaxed);

        Ok(self.sets.remove(set_key).is_some())
    }

    async fn flush(&self) -> Result<()> {
        self.check_available()?;
        self.entries.clear();
        self.sets.clear();
        Ok(())
    }

    async fn key_count(&self) -> Result<u64> {
        self.check_available()?;
        let now = Instant::now();
        let live_entries = self
            .entries
            .iter()
            .filter(|e| e.expires_at > now)
            .count();
        let live_sets = self.sets.iter().filter(|s| s.expires_at > now).count();
        Ok((live_entries + live_sets) as u64)
    }

    async fn memory_used_bytes(&self) -> Result<u64> {
        self.check_available()?;
        let now = Instant::now();
        let bytes: usize = self
            .entries
            .iter()
            .filter(|e| e.expires_at > now)
            .map(|e| e.key().len() + e.data.len())
            .sum();
        Ok(bytes as u64)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_fetch_remove() {
        let store = MemoryStore::new();

        store
            .store("hot:k", Bytes::from_static(b"v"), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(
            store.fetch("hot:k").await.unwrap(),
            Some(Bytes::from_static(b"v"))
        );

        assert!(store.remove("hot:k").await.unwrap());
        assert!(!store.remove("hot:k").await.unwrap());
        assert_eq!(store.fetch("hot:k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lazy_expiry() {
        let store = MemoryStore::new();

        store
            .store("hot:k", Bytes::from_static(b"v"), Duration::from_millis(20))
            .await
            .unwrap();
        assert!(store.fetch("hot:k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.fetch("hot:k").await.unwrap(), None);
        assert_eq!(store.key_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_membership_and_chunked_scan() {
        let store = MemoryStore::new();

        for i in 0..25 {
            store
                .add_tag_member("hot:tag:t", &format!("hot:k{:02}", i), Duration::from_secs(60))
                .await
                .unwrap();
        }

        let mut members = Vec::new();
        let mut cursor = 0;
        loop {
            let (next, chunk) = store.scan_set("hot:tag:t", cursor, 10).await.unwrap();
            assert!(chunk.len() <= 10);
            members.extend(chunk);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        assert_eq!(members.len(), 25);

        assert!(store.remove_set("hot:tag:t").await.unwrap());
        let (cursor, chunk) = store.scan_set("hot:tag:t", 0, 10).await.unwrap();
        assert_eq!(cursor, 0);
        assert!(chunk.is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.set_failing(true);

        assert!(store.ping().await.is_err());
        assert!(store.fetch("hot:k").await.is_err());
        assert!(store
            .store("hot:k", Bytes::new(), Duration::from_secs(1))
            .await
            .is_err());

        store.set_failing(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_flush_and_size_stats() {
        let store = MemoryStore::new();

        store
            .store("hot:a", Bytes::from_static(b"aaaa"), Duration::from_secs(30))
            .await
            .unwrap();
        store
            .store("hot:b", Bytes::from_static(b"bb"), Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(store.key_count().await.unwrap(), 2);
        assert!(store.memory_used_bytes().await.unwrap() >= 6);

        store.flush().await.unwrap();
        assert_eq!(store.key_count().await.unwrap(), 0);
        assert_eq!(store.memory_used_bytes().await.unwrap(), 0);
    }
}
