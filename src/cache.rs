//! TTL-based read cache for export records and list queries
//!
//! A read replica of ledger state, never authoritative: the engine only
//! serves reads from here and invalidates on writes. Entries are dropped,
//! never updated in place. Two TTL tiers: short for single-record reads
//! right after a write, medium for list/search results.

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::core_types::{ExportId, OrgId};
use crate::lifecycle::status::ExportStatus;

/// Cache key derivation - deterministic per export id or query shape
pub mod keys {
    use super::*;

    pub const LIST_PREFIX: &str = "export:list:";

    pub fn export(id: &ExportId) -> String {
        format!("export:{id}")
    }

    pub fn by_status(status: ExportStatus) -> String {
        format!("{LIST_PREFIX}status:{status}")
    }

    pub fn by_org(org: &OrgId) -> String {
        format!("{LIST_PREFIX}org:{org}")
    }
}

/// TTL tier, chosen by the caller based on the volatility of the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Seconds - single-export reads immediately after a write
    Short,
    /// Minutes - list/search results
    Medium,
}

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// In-process TTL cache with exact and prefix invalidation
pub struct RecordCache {
    entries: DashMap<String, CacheEntry>,
    short_ttl: Duration,
    medium_ttl: Duration,
}

impl RecordCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            short_ttl: Duration::from_secs(config.short_ttl_secs),
            medium_ttl: Duration::from_secs(config.medium_ttl_secs),
        }
    }

    fn ttl(&self, tier: Ttl) -> Duration {
        match tier {
            Ttl::Short => self.short_ttl,
            Ttl::Medium => self.medium_ttl,
        }
    }

    /// Fetch a value; expired entries are dropped lazily
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let hit = {
            let entry = self.entries.get(key)?;
            if entry.expires_at <= Instant::now() {
                None
            } else {
                serde_json::from_value(entry.value.clone()).ok()
            }
        };
        if hit.is_none() {
            self.entries.remove(key);
        }
        hit
    }

    /// Store a value under the given TTL tier
    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: &T, tier: Ttl) {
        let key = key.into();
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                // A value we cannot serialize is a bug upstream; the cache
                // stays advisory and simply skips it.
                tracing::warn!(key = %key, error = %e, "Skipping unserializable cache value");
                return;
            }
        };
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl(tier),
            },
        );
    }

    /// Drop one exact key
    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every key starting with `prefix`; returns how many were removed
    ///
    /// Idempotent: a second call with the same prefix removes nothing more.
    pub fn delete_pattern(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        before - self.entries.len()
    }

    /// Number of live (possibly expired, not yet reaped) entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
