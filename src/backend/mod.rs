//! Tier backend stores
//!
//! Each tier owns one backend store. The engine only talks to the
//! [`TierStore`] port; adapters provide the concrete implementations.
//!
//! - [`RedisStore`] - production backend over a Redis-compatible server
//! - [`MemoryStore`] - in-process backend for tests and local development

mod memory;
mod redis;

pub use memory::{MemoryStore, MemoryStoreStats};
pub use redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Storage port implemented by every tier backend.
///
/// Keys are composite keys (`<tierPrefix>:<logicalKey>`); the store treats
/// them as opaque strings. All operations are per-key atomic on the backend
/// side; the engine layers no additional coordination on top.
#[async_trait]
pub trait TierStore: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Fetch the raw bytes stored under a key.
    async fn fetch(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store raw bytes under a key with an expiry.
    async fn store(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Remove a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Add a member to a set and refresh the set's expiry.
    async fn add_tag_member(&self, set_key: &str, member: &str, ttl: Duration) -> Result<()>;

    /// Scan one bounded chunk of a set.
    ///
    /// Returns the next cursor (0 when the scan is complete) and the chunk
    /// of members, so callers never materialize an unbounded member list.
    async fn scan_set(&self, set_key: &str, cursor: u64, count: usize)
        -> Result<(u64, Vec<String>)>;

    /// Remove an entire set. Returns whether it existed.
    async fn remove_set(&self, set_key: &str) -> Result<bool>;

    /// Wipe every key in this store.
    async fn flush(&self) -> Result<()>;

    /// Number of keys currently stored.
    async fn key_count(&self) -> Result<u64>;

    /// Memory used by this store, in bytes.
    async fn memory_used_bytes(&self) -> Result<u64>;
}
