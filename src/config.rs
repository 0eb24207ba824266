//! Engine configuration
//!
//! Plain structs with serde deserialization and complete defaults, so the
//! engine can be constructed from a YAML file, from code, or from nothing.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::tier::CacheTier;

/// Settings for a single tier's backend store.
#[derive(Debug, Clone, Deserialize)]
pub struct TierSettings {
    /// Backend store URL, e.g. `redis://127.0.0.1:6379/0`
    pub url: String,
    /// Entry TTL in seconds
    pub ttl_seconds: u64,
    /// Lookup priority; higher-priority tiers are searched first
    pub priority: u8,
}

impl TierSettings {
    fn new(url: &str, ttl_seconds: u64, priority: u8) -> Self {
        Self {
            url: url.to_string(),
            ttl_seconds,
            priority,
        }
    }

    /// Entry TTL as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Engine configuration.
///
/// The four standing tiers ship with the documented defaults: Hot 30s/100,
/// Predictive 1800s/90, Warm 300s/70, Cold 3600s/40.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Connect/liveness-probe timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Per-backend-call operation timeout in milliseconds
    pub operation_timeout_ms: u64,
    /// Grace period added to tag-set TTLs, in seconds
    pub tag_grace_seconds: u64,
    /// Trailing window for access tracking, in seconds
    pub tracker_window_seconds: u64,
    /// Hot tier settings
    pub hot: TierSettings,
    /// Predictive tier settings
    pub predictive: TierSettings,
    /// Warm tier settings
    pub warm: TierSettings,
    /// Cold tier settings
    pub cold: TierSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2_000,
            operation_timeout_ms: 1_000,
            tag_grace_seconds: 60,
            tracker_window_seconds: 3_600,
            hot: TierSettings::new("redis://127.0.0.1:6379/0", 30, 100),
            predictive: TierSettings::new("redis://127.0.0.1:6379/1", 1_800, 90),
            warm: TierSettings::new("redis://127.0.0.1:6379/2", 300, 70),
            cold: TierSettings::new("redis://127.0.0.1:6379/3", 3_600, 40),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file, filling omitted fields from
    /// defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Settings for one tier.
    pub fn tier(&self, tier: CacheTier) -> &TierSettings {
        match tier {
            CacheTier::Hot => &self.hot,
            CacheTier::Predictive => &self.predictive,
            CacheTier::Warm => &self.warm,
            CacheTier::Cold => &self.cold,
        }
    }

    /// Connect/probe timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Operation timeout as a `Duration`.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Tag-set TTL grace as a `Duration`.
    pub fn tag_grace(&self) -> Duration {
        Duration::from_secs(self.tag_grace_seconds)
    }

    /// Access-tracking trailing window as a `Duration`.
    pub fn tracker_window(&self) -> Duration {
        Duration::from_secs(self.tracker_window_seconds)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        for tier in CacheTier::ALL {
            let settings = self.tier(tier);
            if settings.ttl_seconds == 0 {
                return Err(Error::Configuration(format!(
                    "tier {} must have a non-zero TTL",
                    tier
                )));
            }
            if settings.url.is_empty() {
                return Err(Error::Configuration(format!(
                    "tier {} must have a backend URL",
                    tier
                )));
            }
        }
        if self.operation_timeout_ms == 0 {
            return Err(Error::Configuration(
                "operation timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tier_table() {
        let config = EngineConfig::default();
        assert_eq!(config.hot.ttl_seconds, 30);
        assert_eq!(config.hot.priority, 100);
        assert_eq!(config.predictive.ttl_seconds, 1_800);
        assert_eq!(config.predictive.priority, 90);
        assert_eq!(config.warm.ttl_seconds, 300);
        assert_eq!(config.warm.priority, 70);
        assert_eq!(config.cold.ttl_seconds, 3_600);
        assert_eq!(config.cold.priority, 40);
    }

    #[test]
    fn test_default_validates() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = EngineConfig::default();
        config.warm.ttl_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_overrides_defaults() {
        let yaml = r#"
operation_timeout_ms: 250
hot:
  url: "redis://cache-hot:6379/0"
  ttl_seconds: 15
  priority: 100
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.operation_timeout_ms, 250);
        assert_eq!(config.hot.ttl_seconds, 15);
        assert_eq!(config.hot.url, "redis://cache-hot:6379/0");
        // Untouched tiers keep their defaults
        assert_eq!(config.cold.ttl_seconds, 3_600);
    }
}
