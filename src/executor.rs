use async_trait::async_trait;
use serde_json::Value;

/// A single result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Execution backend, injected at engine construction.
///
/// Camber has no opinion on the storage engine behind it; anything that can
/// turn a query string and a parameter list into rows qualifies. Retry
/// policy, if any, belongs to the implementation — the engine surfaces
/// failures to the caller without retrying.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str, params: &[Value]) -> anyhow::Result<Vec<Row>>;
}
