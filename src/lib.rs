//! StrataCache - Multi-Tier, Tag-Aware Caching Engine
//!
//! A caching layer that sits between latency-sensitive callers (market-data
//! readers, recommendation generators, chart renderers) and slower backing
//! stores. Hot data is served in sub-second time, frequently-read cold data
//! is promoted into faster tiers automatically, and whole groups of keys can
//! be invalidated by semantic tag. A cache failure never becomes an
//! application failure: every backend fault degrades to an ordinary miss.
//!
//! # Architecture
//!
//! ```text
//! caller ──▶ CacheEngine.get(key)
//!               │ AccessTracker.record(key)
//!               ▼
//!        TierRegistry (priority order: Hot → Predictive → Warm → Cold)
//!               │ ConnectionManager.client(tier)   (degraded tier? skip)
//!               ▼
//!        TierStore.fetch ──▶ codec.decode ──▶ hit: count + promote + return
//!               │
//!               ▼
//!        full miss: MetricsCollector.record_miss ──▶ None
//! ```
//!
//! # Modules
//!
//! - [`backend`] - Tier store port and its Redis/in-memory adapters
//! - [`codec`] - Dual-format value encoding with marker-byte dispatch
//! - [`config`] - Engine configuration with complete defaults
//! - [`connection`] - Per-tier handles, startup probes, degraded marking
//! - [`engine`] - The cache engine orchestrator
//! - [`error`] - Error types
//! - [`metrics`] - Hit/miss counters and snapshots
//! - [`tier`] - Tier enum, specs, and registry
//! - [`tracker`] - Trailing-window access tracking
//!
//! # Example
//!
//! ```no_run
//! use stratacache::{CacheEngine, CacheTier, CacheValue, EngineConfig};
//!
//! # async fn run() -> stratacache::Result<()> {
//! let engine = CacheEngine::connect(EngineConfig::default()).await?;
//!
//! let quote = CacheValue::Structured(serde_json::json!({"price": 1_500_000}));
//! engine
//!     .set("market_data:4151", &quote, CacheTier::Cold, &["item_4151"])
//!     .await?;
//!
//! // Hits Cold, promotes into Hot, returns the value
//! let value = engine.get("market_data:4151", None).await;
//! assert!(value.is_some());
//!
//! engine.invalidate_by_tag("item_4151").await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod tier;
pub mod tracker;

// Re-export commonly used types
pub use codec::{CacheValue, ValueFormat};
pub use config::{EngineConfig, TierSettings};
pub use connection::ConnectionManager;
pub use engine::{CacheEngine, TierSizeStats};
pub use error::{Error, Result};
pub use metrics::{MetricsCollector, PerformanceStats};
pub use tier::{CacheTier, TierRegistry, TierSpec};
pub use tracker::AccessTracker;
