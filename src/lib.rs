//! # camber
//!
//! A query acceleration and advisory layer that sits between application
//! code and a relational data store. It accepts raw query strings with
//! optional parameters, executes them through an injected backend with a
//! time-bounded result cache in front, tracks rolling execution
//! statistics, and surfaces slow queries, index suggestions and
//! degradation warnings.
//!
//! The layer deliberately stops short of a real planner: structural
//! analysis is heuristic and its rewritten queries are advisory, not
//! guaranteed-equivalent SQL.
//!
//! ```no_run
//! use std::sync::Arc;
//! use camber::{EngineConfig, QueryEngine};
//! # use camber::{QueryExecutor, Row};
//! # use async_trait::async_trait;
//! # struct Backend;
//! # #[async_trait]
//! # impl QueryExecutor for Backend {
//! #     async fn execute(&self, _q: &str, _p: &[serde_json::Value]) -> anyhow::Result<Vec<Row>> {
//! #         Ok(vec![])
//! #     }
//! # }
//!
//! # async fn run() -> Result<(), camber::EngineError> {
//! let engine = QueryEngine::new(Arc::new(Backend), EngineConfig::default());
//! let rows = engine.execute("SELECT * FROM users WHERE id = ?", &[1.into()]).await?;
//! let advice = engine.optimize("SELECT * FROM users WHERE status = 'active'").await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod monitor;
pub mod query;

pub use config::{ConfigPatch, EngineConfig};
pub use engine::{ExecuteOptions, QueryEngine};
pub use error::{EngineError, Result};
pub use executor::{QueryExecutor, Row};
pub use monitor::{AlertSink, HealthMonitor, TracingAlertSink};
pub use query::advisor::{
    AdvisorWeights, Benefit, IndexKind, IndexSuggestion, OptimizationAdvisor, OptimizationResult,
};
pub use query::analyzer::{JoinTarget, QueryAnalysis, QueryAnalyzer};
pub use query::cache::{CacheKey, ResultCache, DEFAULT_TTL};
pub use query::stats::{AggregateMetrics, ExecutionRecord, StatisticsStore};
