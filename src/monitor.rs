//! Periodic health checks over aggregate metrics.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::query::stats::StatisticsStore;

/// Alerting collaborator for health warnings. The monitor only observes;
/// delivery (logs, pages, dashboards) is the sink's business.
pub trait AlertSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Default sink: structured tracing events.
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn warn(&self, message: &str) {
        warn!(target: "health", "{message}");
    }
}

struct MonitorTask {
    shutdown: watch::Sender<bool>,
    _handle: JoinHandle<()>,
}

/// Background task that wakes on a fixed interval, reads the aggregate
/// metrics, and warns when they degrade. Purely observational: it never
/// raises errors into the engine, and `start`/`stop` are idempotent.
pub struct HealthMonitor {
    stats: Arc<StatisticsStore>,
    config: Arc<RwLock<EngineConfig>>,
    sink: Arc<dyn AlertSink>,
    task: Mutex<Option<MonitorTask>>,
}

impl HealthMonitor {
    pub fn new(
        stats: Arc<StatisticsStore>,
        config: Arc<RwLock<EngineConfig>>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            stats,
            config,
            sink,
            task: Mutex::new(None),
        }
    }

    /// Spawns the periodic check. Calling `start` while already running is
    /// a no-op.
    pub async fn start(&self) {
        let interval_ms = self.config.read().await.health_check_interval_ms;

        let Ok(mut slot) = self.task.lock() else {
            return;
        };
        if slot.is_some() {
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let stats = Arc::clone(&self.stats);
        let config = Arc::clone(&self.config);
        let sink = Arc::clone(&self.sink);
        let period = Duration::from_millis(interval_ms.max(1));

        let handle = tokio::spawn(async move {
            let first_tick = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(first_tick, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        check_health(&stats, &config, sink.as_ref()).await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        *slot = Some(MonitorTask {
            shutdown,
            _handle: handle,
        });
        info!(target: "health", interval_ms, "health monitor started");
    }

    /// Signals the task to stop without waiting on an in-flight tick.
    /// Stopping an already stopped monitor is a no-op.
    pub fn stop(&self) {
        let Ok(mut slot) = self.task.lock() else {
            return;
        };
        if let Some(task) = slot.take() {
            let _ = task.shutdown.send(true);
            info!(target: "health", "health monitor stopped");
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn check_health(
    stats: &StatisticsStore,
    config: &RwLock<EngineConfig>,
    sink: &dyn AlertSink,
) {
    let (threshold_ms, min_rate) = {
        let config = config.read().await;
        (config.slow_query_threshold_ms, config.min_healthy_rate)
    };

    let metrics = stats.aggregate(threshold_ms).await;
    if metrics.total_executions == 0 {
        return;
    }

    if metrics.average_duration_ms > threshold_ms as f64 {
        sink.warn(&format!(
            "average query duration {:.1}ms exceeds the {}ms slow-query threshold",
            metrics.average_duration_ms, threshold_ms
        ));
    }
    if metrics.cache_hit_rate < min_rate {
        sink.warn(&format!(
            "cache hit rate {:.2} is below the healthy minimum {:.2}",
            metrics.cache_hit_rate, min_rate
        ));
    }
    if metrics.index_utilization_rate < min_rate {
        sink.warn(&format!(
            "index utilization rate {:.2} is below the healthy minimum {:.2}",
            metrics.index_utilization_rate, min_rate
        ));
    }
}
