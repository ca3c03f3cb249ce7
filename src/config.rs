// Runtime configuration — TTLs, similarity threshold, and source tiers.
//
// Loaded from a JSON file (VEILLE_CONFIG env override, else the platform
// config dir). A missing file means built-in defaults; a corrupt file or an
// out-of-range threshold is fatal at startup, before any store mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const CONFIG_ENV: &str = "VEILLE_CONFIG";
const DATA_DIR_ENV: &str = "VEILLE_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fetch lookback window in hours.
    #[serde(default = "default_hours_lookback")]
    pub hours_lookback: u64,
    /// TTL for the seen-URL store.
    #[serde(default = "default_seen_url_ttl_days")]
    pub seen_url_ttl_days: u64,
    /// TTL for the topic store.
    #[serde(default = "default_topic_ttl_days")]
    pub topic_ttl_days: u64,
    /// Two articles at or above this combined score are the same story.
    #[serde(default = "default_topic_similarity_threshold")]
    pub topic_similarity_threshold: f64,
    /// Tier for sources absent from the mapping.
    #[serde(default = "default_tier")]
    pub default_tier: u8,
    /// Source name → authority tier (1 = highest authority).
    #[serde(default)]
    pub tiers: HashMap<String, u8>,
}

fn default_hours_lookback() -> u64 {
    24
}
fn default_seen_url_ttl_days() -> u64 {
    30
}
fn default_topic_ttl_days() -> u64 {
    7
}
fn default_topic_similarity_threshold() -> f64 {
    0.40
}
fn default_tier() -> u8 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl Config {
    /// Load from the resolved config path, falling back to the built-in
    /// seed when no file exists. Always validated.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default_seed()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would corrupt every downstream decision.
    pub fn validate(&self) -> Result<()> {
        if !(self.topic_similarity_threshold > 0.0 && self.topic_similarity_threshold <= 1.0) {
            anyhow::bail!(
                "topic_similarity_threshold must be in (0, 1], got {}",
                self.topic_similarity_threshold
            );
        }
        if self.seen_url_ttl_days == 0 || self.topic_ttl_days == 0 {
            anyhow::bail!("store TTLs must be at least one day");
        }
        if self.hours_lookback == 0 {
            anyhow::bail!("hours_lookback must be at least one hour");
        }
        Ok(())
    }

    /// Authority tier for a source name. Lookup order: exact match
    /// (case-insensitive), substring match, configured default.
    pub fn tier_for(&self, source: &str) -> u8 {
        let normalized = source.trim().to_lowercase();
        for (name, &tier) in &self.tiers {
            if name.to_lowercase() == normalized {
                return tier;
            }
        }
        for (name, &tier) in &self.tiers {
            if normalized.contains(&name.to_lowercase()) {
                return tier;
            }
        }
        self.default_tier
    }

    /// Built-in seed covering the usual security-watch feeds. Used when no
    /// config file exists and written out by `veille init`.
    pub fn default_seed() -> Self {
        let mut tiers = HashMap::new();
        for (name, tier) in [
            // Tier 1: CERTs and primary research
            ("CERT-FR", 1),
            ("ANSSI", 1),
            ("CISA", 1),
            ("NVD", 1),
            ("Project Zero", 1),
            // Tier 2: established security press
            ("The Hacker News", 2),
            ("BleepingComputer", 2),
            ("Krebs on Security", 2),
            ("SecurityWeek", 2),
            // Tier 3: aggregators and blogs
            ("Reddit", 3),
            ("Korben", 3),
        ] {
            tiers.insert(name.to_string(), tier);
        }
        Self {
            hours_lookback: default_hours_lookback(),
            seen_url_ttl_days: default_seen_url_ttl_days(),
            topic_ttl_days: default_topic_ttl_days(),
            topic_similarity_threshold: default_topic_similarity_threshold(),
            default_tier: default_tier(),
            tiers,
        }
    }

    /// Resolve the config file path: $VEILLE_CONFIG, else
    /// `<config_dir>/veille/config.json`.
    pub fn config_path() -> PathBuf {
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("veille")
            .join("config.json")
    }

    /// Resolve the data directory holding both store files:
    /// $VEILLE_DATA_DIR, else `<data_dir>/veille`.
    pub fn data_dir() -> PathBuf {
        if let Ok(p) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(p);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("veille")
    }

    pub fn seen_store_path() -> PathBuf {
        Self::data_dir().join("seen_urls.json")
    }

    pub fn topic_store_path() -> PathBuf {
        Self::data_dir().join("topics.json")
    }

    /// Write this config as pretty JSON to `path`, creating parent dirs.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }
}
