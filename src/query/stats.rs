//! Rolling execution statistics.
//!
//! The ledger is an in-memory FIFO ring: nothing survives a restart, and
//! once the capacity is reached the oldest record is evicted first.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Default ring capacity.
pub const DEFAULT_CAPACITY: usize = 1000;

const MAX_FINGERPRINT_CHARS: usize = 200;

/// Metrics for one completed execution. Failed executions are never
/// recorded, so the ledger only describes completed attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Query text truncated to a bounded fingerprint.
    pub fingerprint: String,
    pub duration_ms: u64,
    pub rows_returned: usize,
    pub rows_examined: usize,
    pub served_from_cache: bool,
    /// Unix epoch milliseconds at record time.
    pub timestamp_ms: u64,
}

impl ExecutionRecord {
    pub fn new(
        query: &str,
        duration_ms: u64,
        rows_returned: usize,
        rows_examined: usize,
        served_from_cache: bool,
    ) -> Self {
        Self {
            fingerprint: fingerprint(query),
            duration_ms,
            rows_returned,
            rows_examined,
            served_from_cache,
            timestamp_ms: now_epoch_ms(),
        }
    }
}

/// Truncates query text to at most 200 characters.
pub fn fingerprint(query: &str) -> String {
    query.chars().take(MAX_FINGERPRINT_CHARS).collect()
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Derived snapshot, recomputed from the current ring contents on every
/// call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateMetrics {
    pub total_executions: usize,
    pub average_duration_ms: f64,
    pub slow_execution_count: usize,
    /// Fraction of executions not served from cache, used as an index-use
    /// proxy.
    pub index_utilization_rate: f64,
    pub cache_hit_rate: f64,
}

/// Append-only, capacity-bounded ledger of per-execution metrics.
pub struct StatisticsStore {
    records: RwLock<VecDeque<ExecutionRecord>>,
    capacity: usize,
}

impl StatisticsStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends one record, evicting oldest-first beyond capacity.
    pub async fn record(&self, entry: ExecutionRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.write().await;
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(entry);
    }

    /// Records with duration exceeding the threshold, sorted descending by
    /// duration.
    pub async fn slow_queries(&self, threshold_ms: u64) -> Vec<ExecutionRecord> {
        let records = self.records.read().await;
        let mut slow: Vec<ExecutionRecord> = records
            .iter()
            .filter(|r| r.duration_ms > threshold_ms)
            .cloned()
            .collect();
        slow.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
        slow
    }

    /// Recomputes aggregate metrics from the current contents.
    pub async fn aggregate(&self, slow_threshold_ms: u64) -> AggregateMetrics {
        let records = self.records.read().await;
        let total = records.len();
        if total == 0 {
            return AggregateMetrics::default();
        }

        let total_duration: u64 = records.iter().map(|r| r.duration_ms).sum();
        let cache_hits = records.iter().filter(|r| r.served_from_cache).count();
        let slow = records
            .iter()
            .filter(|r| r.duration_ms > slow_threshold_ms)
            .count();

        AggregateMetrics {
            total_executions: total,
            average_duration_ms: total_duration as f64 / total as f64,
            slow_execution_count: slow,
            index_utilization_rate: (total - cache_hits) as f64 / total as f64,
            cache_hit_rate: cache_hits as f64 / total as f64,
        }
    }

    /// Current ring contents, oldest first.
    pub async fn snapshot(&self) -> Vec<ExecutionRecord> {
        self.records.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
