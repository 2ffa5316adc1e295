//! Result cache keyed by canonical query signature.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::executor::Row;

/// Default entry lifetime: 5 minutes. Overridable per call.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Canonical signature of (query text, serialized parameter list).
///
/// Two calls with identical text and identical parameter values in the
/// same order collide; reordered parameters do not.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    query_hash: String,
    params_hash: String,
}

impl CacheKey {
    pub fn new(query: &str, params: &[Value]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        let query_hash = format!("{:x}", hasher.finalize());

        let serialized = serde_json::to_string(params).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        let params_hash = format!("{:x}", hasher.finalize());

        Self {
            query_hash,
            params_hash,
        }
    }
}

#[derive(Clone)]
struct CacheEntry {
    rows: Arc<Vec<Row>>,
    stored_at: Instant,
    ttl: Duration,
}

/// Expires each entry after its own TTL rather than a cache-wide one.
struct PerEntryExpiry;

impl Expiry<CacheKey, CacheEntry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Time-bounded, capacity-bounded store of previously computed row sets.
/// An entry past its TTL is never returned; eviction of expired entries is
/// lazy.
pub struct ResultCache {
    entries: Cache<CacheKey, CacheEntry>,
}

impl ResultCache {
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryExpiry)
            .build();
        Self { entries }
    }

    /// `None` when the key is absent or the entry has outlived its TTL.
    pub fn lookup(&self, key: &CacheKey) -> Option<Arc<Vec<Row>>> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() >= entry.ttl {
            return None;
        }
        debug!(target: "cache", rows = entry.rows.len(), "cache hit");
        Some(entry.rows)
    }

    /// Unconditionally inserts or replaces.
    pub fn store(&self, key: CacheKey, rows: Vec<Row>, ttl: Duration) {
        debug!(
            target: "cache",
            rows = rows.len(),
            ttl_ms = ttl.as_millis() as u64,
            "caching result"
        );
        let entry = CacheEntry {
            rows: Arc::new(rows),
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.insert(key, entry);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}
