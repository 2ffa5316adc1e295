//! Optimization suggestions derived from structural analysis.
//!
//! Generation is pure and deterministic: the same query and analysis
//! always produce the same result. Rewritten queries are advisory text,
//! not guaranteed-equivalent SQL.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::analyzer::QueryAnalysis;

/// Queries estimated above this row count get a row-limit suggestion.
const UNBOUNDED_ROW_THRESHOLD: u64 = 100;

/// Marker substituted for an unqualified wildcard projection. The advisor
/// has no schema access, so it cannot name real columns.
const EXPLICIT_COLUMNS_MARKER: &str = "SELECT <explicit columns>";

static WILDCARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bselect\s+\*").unwrap());

/// Estimated payoff of creating a suggested index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Benefit {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Ordered,
    Hash,
    Inverted,
    Spatial,
}

/// A candidate index. Identity for deduplication is `(table, columns)`;
/// column order matters for composite keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSuggestion {
    pub table: String,
    pub columns: Vec<String>,
    pub kind: IndexKind,
    pub unique: bool,
    pub partial_predicate: Option<String>,
    pub estimated_benefit: Benefit,
}

impl IndexSuggestion {
    pub fn ordered(table: impl Into<String>, columns: Vec<String>, benefit: Benefit) -> Self {
        Self {
            table: table.into(),
            columns,
            kind: IndexKind::Ordered,
            unique: false,
            partial_predicate: None,
            estimated_benefit: benefit,
        }
    }
}

/// Advisory bundle produced per call; never cached.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub original_query: String,
    pub rewritten_query: String,
    pub estimated_improvement_percent: u8,
    pub suggestions: Vec<String>,
    pub indexes: Vec<IndexSuggestion>,
}

impl OptimizationResult {
    /// A no-advice result, used when analysis is disabled.
    pub fn unchanged(query: &str) -> Self {
        Self {
            original_query: query.to_string(),
            rewritten_query: query.to_string(),
            estimated_improvement_percent: 0,
            suggestions: Vec::new(),
            indexes: Vec::new(),
        }
    }
}

/// Fixed improvement weights. Arbitrary constants carried over as
/// configurable defaults; do not read a cost model into them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdvisorWeights {
    pub predicate: u8,
    pub join: u8,
    pub ordering: u8,
    pub limit: u8,
    /// Upper clamp on the summed estimate.
    pub cap: u8,
}

impl Default for AdvisorWeights {
    fn default() -> Self {
        Self {
            predicate: 30,
            join: 20,
            ordering: 15,
            limit: 10,
            cap: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizationAdvisor {
    weights: AdvisorWeights,
}

impl OptimizationAdvisor {
    pub fn new(weights: AdvisorWeights) -> Self {
        Self { weights }
    }

    /// Produces the suggestion bundle for one query. Never fails; a query
    /// with no recognizable tables yields suggestions with an empty table
    /// field, which callers should treat as non-actionable.
    pub fn generate(&self, original: &str, analysis: &QueryAnalysis) -> OptimizationResult {
        let mut suggestions = Vec::new();
        let mut indexes = Vec::new();
        let mut score = 0u32;

        let primary_table = analysis.tables.first().cloned().unwrap_or_default();

        if !analysis.where_columns.is_empty() {
            suggestions.push(format!(
                "Index the WHERE-clause columns ({})",
                analysis.where_columns.join(", ")
            ));
            indexes.push(IndexSuggestion::ordered(
                primary_table.clone(),
                analysis.where_columns.clone(),
                Benefit::High,
            ));
            score += u32::from(self.weights.predicate);
        }

        for join in &analysis.joins {
            suggestions.push(format!("Index join column {}.{}", join.table, join.column));
            indexes.push(IndexSuggestion::ordered(
                join.table.clone(),
                vec![join.column.clone()],
                Benefit::High,
            ));
        }
        if !analysis.joins.is_empty() {
            score += u32::from(self.weights.join);
        }

        if !analysis.order_by_columns.is_empty() {
            suggestions.push(format!(
                "Index the ORDER BY columns ({}) to avoid a sort",
                analysis.order_by_columns.join(", ")
            ));
            indexes.push(IndexSuggestion::ordered(
                primary_table,
                analysis.order_by_columns.clone(),
                Benefit::Medium,
            ));
            score += u32::from(self.weights.ordering);
        }

        let mut rewritten = original.to_string();

        if WILDCARD_RE.is_match(&rewritten) {
            rewritten = WILDCARD_RE
                .replace(&rewritten, EXPLICIT_COLUMNS_MARKER)
                .into_owned();
            suggestions.push("Select explicit columns instead of *".to_string());
        }

        if analysis.has_limit {
            score += u32::from(self.weights.limit);
        } else if analysis.estimated_row_count > UNBOUNDED_ROW_THRESHOLD {
            suggestions.push("Add a row limit to bound the result set".to_string());
            rewritten = format!("{} LIMIT 100", rewritten.trim_end().trim_end_matches(';'));
        }

        OptimizationResult {
            original_query: original.to_string(),
            rewritten_query: rewritten,
            estimated_improvement_percent: score.min(u32::from(self.weights.cap)) as u8,
            suggestions,
            indexes: dedupe_suggestions(indexes),
        }
    }
}

/// Collapses duplicate `(table, columns)` targets, keeping the
/// higher-benefit entry in the first one's discovery position.
pub fn dedupe_suggestions(candidates: Vec<IndexSuggestion>) -> Vec<IndexSuggestion> {
    let mut out: Vec<IndexSuggestion> = Vec::with_capacity(candidates.len());
    let mut position: HashMap<(String, Vec<String>), usize> = HashMap::new();

    for candidate in candidates {
        let key = (candidate.table.clone(), candidate.columns.clone());
        match position.get(&key) {
            Some(&i) => {
                if candidate.estimated_benefit > out[i].estimated_benefit {
                    out[i] = candidate;
                }
            }
            None => {
                position.insert(key, out.len());
                out.push(candidate);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::analyzer::QueryAnalyzer;

    fn optimize(query: &str) -> OptimizationResult {
        let analysis = QueryAnalyzer::new().analyze(query);
        OptimizationAdvisor::default().generate(query, &analysis)
    }

    #[test]
    fn test_where_clause_yields_matching_index() {
        let result = optimize("SELECT id FROM users WHERE status = 'active'");
        let index = result
            .indexes
            .iter()
            .find(|i| i.columns == vec!["status".to_string()])
            .expect("index over the WHERE columns");
        assert_eq!(index.table, "users");
        assert_eq!(index.estimated_benefit, Benefit::High);
        assert_eq!(index.kind, IndexKind::Ordered);
    }

    #[test]
    fn test_join_columns_suggested_per_pair() {
        let result = optimize(
            "SELECT u.id FROM users u JOIN orders ON users.id = orders.user_id LIMIT 10",
        );
        assert!(result
            .indexes
            .iter()
            .any(|i| i.table == "users" && i.columns == vec!["user_id".to_string()]));
        // join 20 + limit 10
        assert_eq!(result.estimated_improvement_percent, 30);
    }

    #[test]
    fn test_active_users_scenario() {
        let result = optimize("SELECT * FROM users WHERE status = 'active' ORDER BY created_at");
        assert!(result.indexes.len() >= 2);
        assert!(result
            .indexes
            .iter()
            .any(|i| i.columns == vec!["status".to_string()]));
        assert!(result
            .indexes
            .iter()
            .any(|i| i.columns == vec!["created_at".to_string()]
                && i.estimated_benefit == Benefit::Medium));
        // predicate 30 + ordering 15
        assert_eq!(result.estimated_improvement_percent, 45);
    }

    #[test]
    fn test_missing_limit_rewrites_query() {
        let result = optimize("SELECT id FROM events WHERE kind = 'click'");
        assert!(result.rewritten_query.ends_with("LIMIT 100"));
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.contains("row limit")));
    }

    #[test]
    fn test_existing_limit_is_left_alone() {
        let result = optimize("SELECT id FROM events LIMIT 5");
        assert_eq!(result.rewritten_query, "SELECT id FROM events LIMIT 5");
        // limit weight only
        assert_eq!(result.estimated_improvement_percent, 10);
    }

    #[test]
    fn test_wildcard_projection_replaced_with_marker() {
        let result = optimize("SELECT * FROM users LIMIT 1");
        assert!(result.rewritten_query.starts_with("SELECT <explicit columns>"));
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.contains("explicit columns")));
        // qualified wildcard is not touched
        let qualified = optimize("SELECT u.* FROM users u LIMIT 1");
        assert_eq!(qualified.rewritten_query, "SELECT u.* FROM users u LIMIT 1");
    }

    #[test]
    fn test_improvement_is_clamped() {
        let advisor = OptimizationAdvisor::new(AdvisorWeights {
            predicate: 70,
            join: 70,
            ordering: 15,
            limit: 10,
            cap: 80,
        });
        let analysis = QueryAnalyzer::new()
            .analyze("SELECT * FROM a JOIN b ON a.id = b.a_id WHERE x = 1 ORDER BY y");
        let result = advisor.generate("q", &analysis);
        assert_eq!(result.estimated_improvement_percent, 80);
    }

    #[test]
    fn test_no_tables_yields_non_actionable_suggestion() {
        let analysis = QueryAnalyzer::new().analyze("WHERE x = 1");
        let result = OptimizationAdvisor::default().generate("WHERE x = 1", &analysis);
        assert!(result.indexes.iter().all(|i| i.table.is_empty()));
    }

    #[test]
    fn test_dedupe_keeps_higher_benefit_in_place() {
        let candidates = vec![
            IndexSuggestion::ordered("t", vec!["a".to_string()], Benefit::Low),
            IndexSuggestion::ordered("t", vec!["b".to_string()], Benefit::Medium),
            IndexSuggestion::ordered("t", vec!["a".to_string()], Benefit::High),
        ];
        let deduped = dedupe_suggestions(candidates);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].columns, vec!["a".to_string()]);
        assert_eq!(deduped[0].estimated_benefit, Benefit::High);
        assert_eq!(deduped[1].columns, vec!["b".to_string()]);
    }

    #[test]
    fn test_generate_result_contains_no_duplicate_targets() {
        // WHERE column and join column collide on (table, columns)
        let result = optimize(
            "SELECT * FROM orders JOIN users ON orders.id = users.order_id WHERE order_id = 5",
        );
        let mut seen = std::collections::HashSet::new();
        for index in &result.indexes {
            assert!(seen.insert((index.table.clone(), index.columns.clone())));
        }
    }
}
