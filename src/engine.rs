//! Execution orchestration: cache lookup, underlying execution,
//! statistics recording, and the advisory surfaces.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{ConfigPatch, EngineConfig};
use crate::error::EngineError;
use crate::executor::{QueryExecutor, Row};
use crate::monitor::{AlertSink, HealthMonitor, TracingAlertSink};
use crate::query::advisor::{
    dedupe_suggestions, IndexSuggestion, OptimizationAdvisor, OptimizationResult,
};
use crate::query::analyzer::QueryAnalyzer;
use crate::query::cache::{CacheKey, ResultCache};
use crate::query::stats::{AggregateMetrics, ExecutionRecord, StatisticsStore};

/// Per-call execution options.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Consult and populate the result cache. Effective only while caching
    /// is also enabled in the engine configuration.
    pub cache: bool,
    /// Per-call cache TTL override.
    pub ttl: Option<Duration>,
    /// Deadline for the underlying executor.
    pub timeout: Option<Duration>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            cache: true,
            ttl: None,
            timeout: None,
        }
    }
}

impl ExecuteOptions {
    pub fn without_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Public entry point of the layer.
///
/// Holds the shared stores and orchestrates
/// cache lookup → underlying execution → statistics recording → cache
/// population. Construct with [`QueryEngine::new`], use, and optionally
/// stop the health monitor; no implicit global instance exists.
pub struct QueryEngine {
    executor: Arc<dyn QueryExecutor>,
    cache: ResultCache,
    stats: Arc<StatisticsStore>,
    config: Arc<RwLock<EngineConfig>>,
    analyzer: QueryAnalyzer,
    advisor: OptimizationAdvisor,
    monitor: HealthMonitor,
    active_queries: AtomicUsize,
}

impl QueryEngine {
    pub fn new(executor: Arc<dyn QueryExecutor>, config: EngineConfig) -> Self {
        Self::with_alert_sink(executor, config, Arc::new(TracingAlertSink))
    }

    pub fn with_alert_sink(
        executor: Arc<dyn QueryExecutor>,
        config: EngineConfig,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let cache = ResultCache::new(config.max_cache_entries);
        let stats = Arc::new(StatisticsStore::new(config.statistics_capacity));
        let config = Arc::new(RwLock::new(config));
        let monitor = HealthMonitor::new(Arc::clone(&stats), Arc::clone(&config), sink);

        Self {
            executor,
            cache,
            stats,
            config,
            analyzer: QueryAnalyzer::new(),
            advisor: OptimizationAdvisor::default(),
            monitor,
            active_queries: AtomicUsize::new(0),
        }
    }

    pub async fn execute(
        &self,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, EngineError> {
        self.execute_with_options(query, params, ExecuteOptions::default())
            .await
    }

    pub async fn execute_with_options(
        &self,
        query: &str,
        params: &[Value],
        options: ExecuteOptions,
    ) -> Result<Vec<Row>, EngineError> {
        self.active_queries.fetch_add(1, Ordering::Relaxed);
        let result = self.execute_inner(query, params, options).await;
        self.active_queries.fetch_sub(1, Ordering::Relaxed);
        result
    }

    async fn execute_inner(
        &self,
        query: &str,
        params: &[Value],
        options: ExecuteOptions,
    ) -> Result<Vec<Row>, EngineError> {
        let (caching_enabled, default_ttl_ms) = {
            let config = self.config.read().await;
            (config.caching_enabled, config.cache_ttl_ms)
        };
        let use_cache = caching_enabled && options.cache;
        let key = CacheKey::new(query, params);

        if use_cache {
            let lookup_start = Instant::now();
            if let Some(rows) = self.cache.lookup(&key) {
                let duration_ms = lookup_start.elapsed().as_millis() as u64;
                self.stats
                    .record(ExecutionRecord::new(query, duration_ms, rows.len(), 0, true))
                    .await;
                info!(
                    target: "queries",
                    query,
                    duration_ms,
                    rows_returned = rows.len(),
                    cache_hit = true,
                    "query served from cache"
                );
                return Ok(rows.as_ref().clone());
            }
        }

        let start = Instant::now();
        let outcome = match options.timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.executor.execute(query, params)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let timeout_ms = deadline.as_millis() as u64;
                        warn!(target: "queries", query, timeout_ms, "query cancelled");
                        return Err(EngineError::Cancelled { timeout_ms });
                    }
                }
            }
            None => self.executor.execute(query, params).await,
        };
        let rows = outcome.map_err(|source| {
            warn!(target: "queries", query, error = %source, "query execution failed");
            EngineError::ExecutionFailed(source)
        })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.stats
            .record(ExecutionRecord::new(
                query,
                duration_ms,
                rows.len(),
                rows.len(),
                false,
            ))
            .await;

        if use_cache {
            let ttl = options
                .ttl
                .unwrap_or(Duration::from_millis(default_ttl_ms));
            self.cache.store(key, rows.clone(), ttl);
        }

        info!(
            target: "queries",
            query,
            duration_ms,
            rows_returned = rows.len(),
            cache_hit = false,
            "query executed"
        );
        Ok(rows)
    }

    /// Structural analysis plus suggestion generation. Pure; never fails.
    pub async fn optimize(&self, query: &str) -> OptimizationResult {
        let (analysis_enabled, index_enabled) = {
            let config = self.config.read().await;
            (
                config.query_analysis_enabled,
                config.index_optimization_enabled,
            )
        };

        if !analysis_enabled {
            return OptimizationResult::unchanged(query);
        }

        let analysis = self.analyzer.analyze(query);
        let mut result = self.advisor.generate(query, &analysis);
        if !index_enabled {
            result.indexes.clear();
        }
        result
    }

    pub async fn metrics(&self) -> AggregateMetrics {
        let threshold_ms = self.config.read().await.slow_query_threshold_ms;
        self.stats.aggregate(threshold_ms).await
    }

    pub async fn slow_queries(&self, threshold_ms: u64) -> Vec<ExecutionRecord> {
        self.stats.slow_queries(threshold_ms).await
    }

    /// Optimizes every distinct query currently in the slow-query list and
    /// returns the merged index suggestions: deduplicated by
    /// `(table, columns)` keeping the higher benefit, sorted descending by
    /// benefit with discovery order preserved on ties.
    pub async fn index_suggestions(&self) -> Vec<IndexSuggestion> {
        let (index_enabled, threshold_ms) = {
            let config = self.config.read().await;
            (
                config.index_optimization_enabled,
                config.slow_query_threshold_ms,
            )
        };
        if !index_enabled {
            return Vec::new();
        }

        let slow = self.stats.slow_queries(threshold_ms).await;
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for record in slow {
            if !seen.insert(record.fingerprint.clone()) {
                continue;
            }
            let result = self.optimize(&record.fingerprint).await;
            candidates.extend(result.indexes);
        }

        let mut suggestions = dedupe_suggestions(candidates);
        suggestions.sort_by(|a, b| b.estimated_benefit.cmp(&a.estimated_benefit));
        suggestions
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn get_config(&self) -> EngineConfig {
        self.config.read().await.clone()
    }

    /// Applies the provided fields to the live configuration. Capacity
    /// values size their stores at construction and only update the
    /// surfaced config here.
    pub async fn update_config(&self, patch: ConfigPatch) {
        let mut config = self.config.write().await;
        patch.apply(&mut config);
    }

    pub async fn start_monitor(&self) {
        self.monitor.start().await;
    }

    pub fn stop_monitor(&self) {
        self.monitor.stop();
    }

    /// Number of `execute` calls currently in flight.
    pub fn active_queries(&self) -> usize {
        self.active_queries.load(Ordering::Relaxed)
    }
}
