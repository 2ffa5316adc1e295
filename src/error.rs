use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The injected executor returned an error. Surfaced directly to the
    /// caller; failed executions contribute no statistics record, so
    /// failure noise never pollutes slow-query analysis.
    #[error("query execution failed: {0}")]
    ExecutionFailed(#[source] anyhow::Error),

    /// The executor did not complete within the caller's deadline.
    /// Cancelled executions contribute no statistics record either.
    #[error("query cancelled after {timeout_ms}ms")]
    Cancelled { timeout_ms: u64 },

    /// Reserved for deployments that act on index suggestions with a real
    /// DDL side effect. Counted by callers, never fatal; the
    /// suggestion-generation path itself cannot fail.
    #[error("index creation failed on {table}: {reason}")]
    IndexCreationFailed { table: String, reason: String },

    /// Structural analysis degrades to an empty analysis instead of
    /// failing, so the engine never constructs this variant itself.
    #[error("query analysis failed: {0}")]
    AnalysisFailed(String),
}
