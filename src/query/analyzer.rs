//! Heuristic structural analysis of query text.
//!
//! ### WARNING
//! This is regex-based, best-effort extraction, not a SQL parser. It is
//! close enough for advisory work and it never fails: input it cannot make
//! sense of degrades to an empty analysis. Swapping in a real parser would
//! not change the contract as long as the same structural facts come out.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder row estimate used until a planner integration exists.
/// Callers must not treat it as authoritative.
const DEFAULT_ROW_ESTIMATE: u64 = 1000;

/// Tokens that can never be column names.
const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "null", "like", "between", "asc", "desc", "select", "from",
    "where", "join", "on", "group", "order", "by", "limit", "having", "distinct", "as",
];

static TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:from|join)\s+([A-Za-z_][A-Za-z0-9_.]*)").unwrap());

static JOIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bjoin\s+[A-Za-z_][A-Za-z0-9_.]*\s+on\s+([A-Za-z_]\w*)\.([A-Za-z_]\w*)\s*=\s*([A-Za-z_]\w*)\.([A-Za-z_]\w*)",
    )
    .unwrap()
});

static SELECT_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bselect\s+(?:distinct\s+)?(.*?)\bfrom\b").unwrap());

static WHERE_CLAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bwhere\s+(.*?)(?:\bgroup\s+by\b|\border\s+by\b|\blimit\b|$)").unwrap()
});

static ORDER_CLAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\border\s+by\s+(.*?)(?:\blimit\b|$)").unwrap());

static GROUP_CLAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bgroup\s+by\s+(.*?)(?:\bhaving\b|\border\s+by\b|\blimit\b|$)").unwrap()
});

static LIMIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\blimit\b").unwrap());

/// Column references anchored to a comparison operator. Qualified
/// references capture the column part only.
static PREDICATE_COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:[A-Za-z_]\w*\.)?([A-Za-z_]\w*)\s*(?:=|!=|<>|>=|<=|>|<|\blike\b|\bin\b|\bis\b|\bbetween\b)",
    )
    .unwrap()
});

/// One side of an equality join: the table whose column should be indexed
/// and the right-hand join column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTarget {
    pub table: String,
    pub column: String,
}

/// Structural facts extracted from one query string. Immutable once
/// produced; owned by the call that created it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Tables named after `FROM`/`JOIN`, in appearance order, deduplicated.
    pub tables: Vec<String>,
    /// Referenced column names (projection, predicates, ordering,
    /// grouping), in appearance order, deduplicated.
    pub columns: Vec<String>,
    pub joins: Vec<JoinTarget>,
    /// Empty when the query has no recognizable predicates.
    pub where_columns: Vec<String>,
    pub order_by_columns: Vec<String>,
    pub group_by_columns: Vec<String>,
    pub has_limit: bool,
    pub estimated_row_count: u64,
}

/// Stateless structural analyzer. `analyze` never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let tables = extract_tables(query);
        let joins = extract_joins(query);
        let where_columns = extract_predicate_columns(query);
        let order_by_columns = extract_list_columns(&ORDER_CLAUSE_RE, query);
        let group_by_columns = extract_list_columns(&GROUP_CLAUSE_RE, query);

        let mut columns = extract_list_columns(&SELECT_LIST_RE, query);
        for extra in where_columns
            .iter()
            .chain(order_by_columns.iter())
            .chain(group_by_columns.iter())
        {
            push_unique(&mut columns, extra.clone());
        }

        QueryAnalysis {
            tables,
            columns,
            joins,
            where_columns,
            order_by_columns,
            group_by_columns,
            has_limit: LIMIT_RE.is_match(query),
            estimated_row_count: DEFAULT_ROW_ESTIMATE,
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !value.is_empty() && !list.contains(&value) {
        list.push(value);
    }
}

fn extract_tables(query: &str) -> Vec<String> {
    let mut tables = Vec::new();
    for capture in TABLE_RE.captures_iter(query) {
        push_unique(&mut tables, capture[1].to_string());
    }
    tables
}

fn extract_joins(query: &str) -> Vec<JoinTarget> {
    JOIN_RE
        .captures_iter(query)
        .map(|capture| JoinTarget {
            table: capture[1].to_string(),
            column: capture[4].to_string(),
        })
        .collect()
}

fn extract_predicate_columns(query: &str) -> Vec<String> {
    let Some(clause) = WHERE_CLAUSE_RE
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    let mut columns = Vec::new();
    for capture in PREDICATE_COLUMN_RE.captures_iter(clause) {
        let column = capture[1].to_string();
        if !KEYWORDS.contains(&column.to_ascii_lowercase().as_str()) {
            push_unique(&mut columns, column);
        }
    }
    columns
}

/// Comma-separated column terms of a select list or an ORDER BY /
/// GROUP BY clause. Direction keywords are dropped and qualifiers reduced.
fn extract_list_columns(clause_re: &Regex, query: &str) -> Vec<String> {
    let Some(clause) = clause_re
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    let mut columns = Vec::new();
    for term in clause.split(',') {
        if let Some(column) = reduce_column_term(term) {
            push_unique(&mut columns, column);
        }
    }
    columns
}

/// Reduces one select/order/group term to a bare column name: takes the
/// first whitespace token, strips the qualifier, skips wildcards, function
/// calls, literals and keywords.
fn reduce_column_term(term: &str) -> Option<String> {
    let token = term.trim().split_whitespace().next()?;
    if token.contains('(') || token.contains(')') || token.contains('*') || token.contains('\'') {
        return None;
    }
    let column = token.rsplit('.').next().unwrap_or(token);
    if column.is_empty()
        || !column.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        || !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        || KEYWORDS.contains(&column.to_ascii_lowercase().as_str())
    {
        return None;
    }
    Some(column.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(query: &str) -> QueryAnalysis {
        QueryAnalyzer::new().analyze(query)
    }

    #[test]
    fn test_tables_after_from_and_join() {
        let analysis = analyze("SELECT id FROM users JOIN orders ON users.id = orders.user_id");
        assert_eq!(analysis.tables, vec!["users", "orders"]);
    }

    #[test]
    fn test_join_targets() {
        let analysis = analyze(
            "SELECT * FROM users JOIN orders ON users.id = orders.user_id \
             JOIN items ON orders.id = items.order_id",
        );
        assert_eq!(
            analysis.joins,
            vec![
                JoinTarget {
                    table: "users".to_string(),
                    column: "user_id".to_string()
                },
                JoinTarget {
                    table: "orders".to_string(),
                    column: "order_id".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_where_columns_reduce_qualifiers() {
        let analysis =
            analyze("SELECT * FROM users u WHERE u.status = 'active' AND age > 21 LIMIT 10");
        assert_eq!(analysis.where_columns, vec!["status", "age"]);
        assert!(analysis.has_limit);
    }

    #[test]
    fn test_where_stops_at_clause_boundary() {
        let analysis = analyze("SELECT * FROM t WHERE a = 1 ORDER BY b");
        assert_eq!(analysis.where_columns, vec!["a"]);
        assert_eq!(analysis.order_by_columns, vec!["b"]);
    }

    #[test]
    fn test_order_and_group_by() {
        let analysis = analyze(
            "SELECT region, total FROM sales GROUP BY region, t.channel ORDER BY total DESC, region ASC",
        );
        assert_eq!(analysis.group_by_columns, vec!["region", "channel"]);
        assert_eq!(analysis.order_by_columns, vec!["total", "region"]);
    }

    #[test]
    fn test_projection_columns_skip_wildcard_and_functions() {
        let analysis = analyze("SELECT u.name, COUNT(*), age AS years FROM users u");
        assert_eq!(analysis.columns, vec!["name", "age"]);

        let wildcard = analyze("SELECT * FROM users");
        assert!(wildcard.columns.is_empty());
    }

    #[test]
    fn test_limit_flag() {
        assert!(analyze("SELECT * FROM t LIMIT 5").has_limit);
        assert!(analyze("select * from t limit 5").has_limit);
        assert!(!analyze("SELECT * FROM t").has_limit);
    }

    #[test]
    fn test_unparseable_input_degrades_to_empty() {
        let analysis = analyze("not even close to sql");
        assert!(analysis.tables.is_empty());
        assert!(analysis.columns.is_empty());
        assert!(analysis.joins.is_empty());
        assert!(analysis.where_columns.is_empty());
        assert!(!analysis.has_limit);
    }

    #[test]
    fn test_active_users_scenario() {
        let analysis =
            analyze("SELECT * FROM users WHERE status = 'active' ORDER BY created_at");
        assert_eq!(analysis.tables, vec!["users"]);
        assert_eq!(analysis.where_columns, vec!["status"]);
        assert_eq!(analysis.order_by_columns, vec!["created_at"]);
        assert!(!analysis.has_limit);
    }
}
