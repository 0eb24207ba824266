//! Cache tier definitions and registry
//!
//! Tiers form a closed set, so lookups are exhaustive matches rather than
//! string-keyed map lookups that can silently come back empty. Unknown tier
//! names only exist at the configuration/CLI boundary, where they are a hard
//! error.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Cache tier enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// Sub-second reads for the hottest keys
    Hot,
    /// Pre-warmed data produced by preload schedulers
    Predictive,
    /// Recently active data
    Warm,
    /// Long-TTL fallback tier
    Cold,
}

impl CacheTier {
    /// All tiers, in default lookup order (priority-descending).
    pub const ALL: [CacheTier; 4] = [
        CacheTier::Hot,
        CacheTier::Predictive,
        CacheTier::Warm,
        CacheTier::Cold,
    ];

    /// Canonical lowercase name, also used as the composite-key prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheTier::Hot => "hot",
            CacheTier::Predictive => "predictive",
            CacheTier::Warm => "warm",
            CacheTier::Cold => "cold",
        }
    }

    /// Dense index for per-tier arrays.
    pub fn index(self) -> usize {
        match self {
            CacheTier::Hot => 0,
            CacheTier::Predictive => 1,
            CacheTier::Warm => 2,
            CacheTier::Cold => 3,
        }
    }

    /// Composite storage key for a logical key in this tier.
    ///
    /// The logical key carries the caller's namespace (`market_data:4151`);
    /// the tier prefix keeps per-tier copies independent.
    pub fn composite_key(self, logical_key: &str) -> String {
        format!("{}:{}", self.as_str(), logical_key)
    }

    /// Key of the tag membership set for `tag` in this tier.
    pub fn tag_set_key(self, tag: &str) -> String {
        format!("{}:tag:{}", self.as_str(), tag)
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CacheTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hot" => Ok(CacheTier::Hot),
            "predictive" => Ok(CacheTier::Predictive),
            "warm" => Ok(CacheTier::Warm),
            "cold" => Ok(CacheTier::Cold),
            other => Err(Error::Configuration(format!("unknown tier name: {}", other))),
        }
    }
}

/// Static description of one configured tier.
#[derive(Debug, Clone)]
pub struct TierSpec {
    /// Which tier this spec describes
    pub tier: CacheTier,
    /// Entry TTL for this tier
    pub ttl: Duration,
    /// Lookup priority; higher is searched first
    pub priority: u8,
    /// Backend store identifier (connection URL)
    pub backend_id: String,
}

/// Immutable registry of the four configured tiers.
#[derive(Debug, Clone)]
pub struct TierRegistry {
    // Held priority-descending
    specs: Vec<TierSpec>,
}

impl TierRegistry {
    /// Build the registry from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut specs: Vec<TierSpec> = CacheTier::ALL
            .into_iter()
            .map(|tier| {
                let settings = config.tier(tier);
                TierSpec {
                    tier,
                    ttl: settings.ttl(),
                    priority: settings.priority,
                    backend_id: settings.url.clone(),
                }
            })
            .collect();
        specs.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { specs }
    }

    /// Resolve a tier by name.
    ///
    /// An unknown name is a programmer error, never a cache miss.
    pub fn resolve(&self, name: &str) -> Result<CacheTier> {
        name.parse()
    }

    /// Spec for one tier.
    pub fn spec(&self, tier: CacheTier) -> &TierSpec {
        // The registry always holds all four tiers
        self.specs
            .iter()
            .find(|s| s.tier == tier)
            .expect("registry holds every tier")
    }

    /// Entry TTL for one tier.
    pub fn ttl(&self, tier: CacheTier) -> Duration {
        self.spec(tier).ttl
    }

    /// Tiers in priority-descending lookup order.
    pub fn by_priority(&self) -> impl Iterator<Item = &TierSpec> {
        self.specs.iter()
    }

    /// The highest-priority tier (promotion target).
    pub fn highest(&self) -> CacheTier {
        self.specs[0].tier
    }
}

impl Default for TierRegistry {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

// =============================================================================
// Tests
// =============================================================================
