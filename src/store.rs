// TTL key stores — the only durable state in the pipeline.
//
// Two instances back the engine: one keyed by article URL, one keyed by
// topic fingerprint. The on-disk format is a flat JSON map so a stats-only
// invocation can read it while a fetch invocation holds it; last writer
// wins on save. A corrupt or missing file is treated as an empty store and
// a run never aborts on a store problem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::article::Article;

const SECS_PER_DAY: u64 = 24 * 3600;

/// A store value that carries its creation timestamp.
pub trait TtlEntry {
    /// Unix seconds when the key was first observed.
    fn first_seen(&self) -> u64;
}

/// Value for the seen-URL store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    pub first_seen: u64,
}

impl TtlEntry for SeenEntry {
    fn first_seen(&self) -> u64 {
        self.first_seen
    }
}

/// Value for the topic store: the representative article kept for a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub first_seen: u64,
    /// Tier of the representative's source at the time it was recorded.
    pub tier: u8,
    pub article: Article,
}

impl TtlEntry for TopicEntry {
    fn first_seen(&self) -> u64 {
        self.first_seen
    }
}

/// Read-only introspection snapshot for the `stats` command.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub count: usize,
    pub ttl_days: u64,
    pub path: PathBuf,
}

/// Persistent key → timestamped-entry map with expiry-on-read.
///
/// Entries are created on first observation and never refreshed: the
/// original `first_seen` enforces a hard TTL. Expired entries are purged
/// lazily at the start of a run.
#[derive(Debug)]
pub struct TtlStore<V> {
    path: PathBuf,
    ttl_secs: u64,
    entries: HashMap<String, V>,
}

impl<V: TtlEntry + Serialize + DeserializeOwned> TtlStore<V> {
    /// Deserialize persisted state from `path`.
    ///
    /// Fails softly: a missing file starts empty, a corrupt file is logged
    /// and replaced by an empty store on the next save.
    pub fn load(path: impl Into<PathBuf>, ttl_days: u64) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, V>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt store file, starting empty");
                    HashMap::new()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no persisted store, starting empty");
                HashMap::new()
            }
        };
        Self {
            path,
            ttl_secs: ttl_days * SECS_PER_DAY,
            entries,
        }
    }

    fn expired(&self, entry: &V, now: u64) -> bool {
        now.saturating_sub(entry.first_seen()) > self.ttl_secs
    }

    /// True if `key` exists and has not expired relative to `now`.
    pub fn is_present(&self, key: &str, now: u64) -> bool {
        self.entries.get(key).is_some_and(|e| !self.expired(e, now))
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Insert the entry if absent. A repeat observation is a no-op so the
    /// original `first_seen` survives. Returns whether the key was new.
    pub fn mark(&mut self, key: &str, value: V) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), value);
        true
    }

    /// Drop all expired entries. Returns how many were removed.
    pub fn purge(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl_secs;
        self.entries
            .retain(|_, e| now.saturating_sub(e.first_seen()) <= ttl);
        before - self.entries.len()
    }

    /// Atomically persist the current mapping: write to a temp file, then
    /// rename over the target, so a crash mid-write never corrupts the store.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating store directory {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("writing store temp file {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing store file {}", self.path.display()))?;
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            count: self.entries.len(),
            ttl_days: self.ttl_secs / SECS_PER_DAY,
            path: self.path.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
