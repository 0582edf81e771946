//! Static SQL pattern analysis
//!
//! This module classifies a statement into a [`QueryPattern`]:
//! - Referenced tables (first-seen order, original casing)
//! - Primary query type
//! - Performance anti-patterns and the techniques that address them
//! - A coarse complexity band and keyword categories
//!
//! Analysis never fails. Unrecognizable input degrades to a basic-select,
//! simple, pattern-free profile.

mod rules;

pub use rules::{contains_token, normalize, SqlFeatures};

use regex::Regex;
use rules::{
    complexity_for_score, complexity_score, ANTI_PATTERN_RULES, KEYWORD_RULES,
    STRUCTURAL_OP_RULES, TYPE_RULES,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

static TABLE_RE: OnceLock<Regex> = OnceLock::new();

fn table_re() -> &'static Regex {
    TABLE_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:from|join)\s+([A-Za-z_][A-Za-z0-9_$]*(?:\.[A-Za-z_][A-Za-z0-9_$]*)?)")
            .expect("table pattern is valid")
    })
}

/// Primary shape of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryType {
    SleepTest,
    ComplexJoin,
    SimpleJoin,
    Aggregation,
    PatternSearch,
    FullSelect,
    FilteredSelect,
    BasicSelect,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::SleepTest => "sleep-test",
            QueryType::ComplexJoin => "complex-join",
            QueryType::SimpleJoin => "simple-join",
            QueryType::Aggregation => "aggregation",
            QueryType::PatternSearch => "pattern-search",
            QueryType::FullSelect => "full-select",
            QueryType::FilteredSelect => "filtered-select",
            QueryType::BasicSelect => "basic-select",
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self, QueryType::ComplexJoin | QueryType::SimpleJoin)
    }
}

/// Complexity band derived from the additive score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

/// Constructs known to correlate with poor performance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AntiPattern {
    SelectStar,
    LeadingWildcardLike,
    MissingLimit,
    CartesianJoin,
    FunctionInWhere,
    SubqueryInsteadOfJoin,
    OrderWithoutLimit,
}

impl AntiPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            AntiPattern::SelectStar => "select-star",
            AntiPattern::LeadingWildcardLike => "leading-wildcard-like",
            AntiPattern::MissingLimit => "missing-limit",
            AntiPattern::CartesianJoin => "cartesian-join",
            AntiPattern::FunctionInWhere => "function-in-where",
            AntiPattern::SubqueryInsteadOfJoin => "subquery-instead-of-join",
            AntiPattern::OrderWithoutLimit => "order-without-limit",
        }
    }

    /// The technique that addresses this anti-pattern
    pub fn remedy(&self) -> OptimizationOp {
        match self {
            AntiPattern::SelectStar => OptimizationOp::SpecifyColumns,
            AntiPattern::LeadingWildcardLike => OptimizationOp::OptimizeLikePatterns,
            AntiPattern::MissingLimit => OptimizationOp::AddLimitClause,
            AntiPattern::CartesianJoin => OptimizationOp::ExplicitJoinSyntax,
            AntiPattern::FunctionInWhere => OptimizationOp::MoveFunctionsToSelect,
            AntiPattern::SubqueryInsteadOfJoin => OptimizationOp::ConvertToJoin,
            AntiPattern::OrderWithoutLimit => OptimizationOp::AddResultLimiting,
        }
    }
}

/// Suggested optimization techniques
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationOp {
    SpecifyColumns,
    OptimizeLikePatterns,
    AddLimitClause,
    ExplicitJoinSyntax,
    MoveFunctionsToSelect,
    ConvertToJoin,
    AddResultLimiting,
    IndexGroupByColumns,
    IndexJoinColumns,
    IndexWhereColumns,
}

impl OptimizationOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationOp::SpecifyColumns => "specify-columns",
            OptimizationOp::OptimizeLikePatterns => "optimize-like-patterns",
            OptimizationOp::AddLimitClause => "add-limit-clause",
            OptimizationOp::ExplicitJoinSyntax => "explicit-join-syntax",
            OptimizationOp::MoveFunctionsToSelect => "move-functions-to-select",
            OptimizationOp::ConvertToJoin => "convert-to-join",
            OptimizationOp::AddResultLimiting => "add-result-limiting",
            OptimizationOp::IndexGroupByColumns => "index-group-by-columns",
            OptimizationOp::IndexJoinColumns => "index-join-columns",
            OptimizationOp::IndexWhereColumns => "index-where-columns",
        }
    }
}

/// Keyword categories used to steer retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeywordTag {
    Joins,
    Indexes,
    Aggregation,
    Sorting,
    Limiting,
    Filtering,
    Deduplication,
    SetOperations,
    Subqueries,
    PatternMatching,
}

impl KeywordTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordTag::Joins => "joins",
            KeywordTag::Indexes => "indexes",
            KeywordTag::Aggregation => "aggregation",
            KeywordTag::Sorting => "sorting",
            KeywordTag::Limiting => "limiting",
            KeywordTag::Filtering => "filtering",
            KeywordTag::Deduplication => "deduplication",
            KeywordTag::SetOperations => "set-operations",
            KeywordTag::Subqueries => "subqueries",
            KeywordTag::PatternMatching => "pattern-matching",
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(QueryType, Complexity, AntiPattern, OptimizationOp, KeywordTag);

/// Structural profile of a SQL statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPattern {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub tables: Vec<String>,
    pub anti_patterns: Vec<AntiPattern>,
    #[serde(rename = "optimization_opportunities")]
    pub optimization_ops: Vec<OptimizationOp>,
    pub complexity: Complexity,
    pub keywords: Vec<KeywordTag>,
}

impl QueryPattern {
    pub fn has_anti_pattern(&self, anti_pattern: AntiPattern) -> bool {
        self.anti_patterns.contains(&anti_pattern)
    }
}

/// Stateless analyzer; cheap to construct and share
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Build the structural profile of `sql`
    pub fn analyze(&self, sql: &str) -> QueryPattern {
        let sql = sql.trim();
        let tables = extract_tables(sql);
        let features = SqlFeatures::new(sql, tables.len());

        let anti_patterns = detect_anti_patterns(&features);
        let optimization_ops = identify_optimizations(&features, &anti_patterns);

        QueryPattern {
            query_type: classify(&features),
            tables,
            optimization_ops,
            anti_patterns,
            complexity: complexity_for_score(complexity_score(&features)),
            keywords: extract_keywords(&features),
        }
    }
}

/// Convenience wrapper around [`QueryAnalyzer::analyze`]
pub fn analyze(sql: &str) -> QueryPattern {
    QueryAnalyzer::new().analyze(sql)
}

fn extract_tables(sql: &str) -> Vec<String> {
    let mut tables: Vec<String> = Vec::new();
    for caps in table_re().captures_iter(sql) {
        if let Some(name) = caps.get(1) {
            let name = name.as_str();
            if !tables.iter().any(|t| t == name) {
                tables.push(name.to_string());
            }
        }
    }
    tables
}

fn classify(features: &SqlFeatures) -> QueryType {
    TYPE_RULES
        .iter()
        .find(|(rule, _)| rule(features))
        .map(|(_, query_type)| *query_type)
        .unwrap_or(QueryType::BasicSelect)
}

fn detect_anti_patterns(features: &SqlFeatures) -> Vec<AntiPattern> {
    ANTI_PATTERN_RULES
        .iter()
        .filter(|(rule, _)| rule(features))
        .map(|(_, anti_pattern)| *anti_pattern)
        .collect()
}

fn identify_optimizations(
    features: &SqlFeatures,
    anti_patterns: &[AntiPattern],
) -> Vec<OptimizationOp> {
    let mut ops: Vec<OptimizationOp> = anti_patterns.iter().map(AntiPattern::remedy).collect();
    ops.extend(
        STRUCTURAL_OP_RULES
            .iter()
            .filter(|(rule, _)| rule(features))
            .map(|(_, op)| *op),
    );
    ops
}

fn extract_keywords(features: &SqlFeatures) -> Vec<KeywordTag> {
    let mut tags = Vec::new();
    for (token, tag) in KEYWORD_RULES {
        if features.has(token) && !tags.contains(tag) {
            tags.push(*tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_join_profile() {
        let pattern = analyze(
            "SELECT * FROM customers c JOIN orders o ON c.id=o.customer_id WHERE c.city='Paris'",
        );

        assert_eq!(pattern.query_type, QueryType::SimpleJoin);
        assert_eq!(pattern.tables, vec!["customers", "orders"]);
        assert!(pattern.has_anti_pattern(AntiPattern::MissingLimit));
        assert!(pattern.has_anti_pattern(AntiPattern::SelectStar));
        assert!(!pattern.has_anti_pattern(AntiPattern::CartesianJoin));
        // 2 tables (+1) and 1 join (+1)
        assert_eq!(pattern.complexity, Complexity::Simple);
        assert!(pattern.optimization_ops.contains(&OptimizationOp::IndexJoinColumns));
        assert!(pattern.optimization_ops.contains(&OptimizationOp::IndexWhereColumns));
    }

    #[test]
    fn test_pattern_search_profile() {
        let pattern = analyze(
            "SELECT id,name FROM products WHERE name LIKE '%widget%' ORDER BY created_at",
        );

        assert_eq!(pattern.query_type, QueryType::PatternSearch);
        assert!(pattern.has_anti_pattern(AntiPattern::LeadingWildcardLike));
        assert!(pattern.has_anti_pattern(AntiPattern::OrderWithoutLimit));
        assert!(pattern.has_anti_pattern(AntiPattern::MissingLimit));
        assert!(!pattern.has_anti_pattern(AntiPattern::CartesianJoin));
        assert_eq!(pattern.tables, vec!["products"]);
    }

    #[test]
    fn test_group_by_outranks_wildcard_search() {
        let pattern =
            analyze("SELECT dept, COUNT(*) FROM emp WHERE name LIKE '%son' GROUP BY dept");
        assert_eq!(pattern.query_type, QueryType::Aggregation);

        let pattern = analyze("SELECT id FROM emp ORDER BY hired_at");
        assert_eq!(pattern.query_type, QueryType::Aggregation);
    }

    #[test]
    fn test_comma_join_is_cartesian() {
        let pattern =
            analyze("SELECT c.name,p.name FROM customers c, products p WHERE c.city='London'");

        assert!(pattern.has_anti_pattern(AntiPattern::CartesianJoin));
        assert!(!pattern.query_type.is_join());
        assert_eq!(pattern.query_type, QueryType::FilteredSelect);
        assert!(pattern
            .optimization_ops
            .contains(&OptimizationOp::ExplicitJoinSyntax));
    }

    #[test]
    fn test_sleep_wins_over_everything() {
        let pattern = analyze("SELECT SLEEP(2), a.* FROM a JOIN b ON a.id = b.id ORDER BY 1");
        assert_eq!(pattern.query_type, QueryType::SleepTest);
    }

    #[test]
    fn test_prefixed_sleep_call_is_sleep_test() {
        assert_eq!(analyze("SELECT pg_sleep(5)").query_type, QueryType::SleepTest);
        assert_eq!(
            analyze("select benchmark_sleep (1) from dual").query_type,
            QueryType::SleepTest
        );
    }

    #[test]
    fn test_complex_join_and_complexity() {
        let sql = "SELECT c.email, SUM(oi.qty) FROM customers c \
                   JOIN orders o ON o.customer_id = c.id \
                   LEFT JOIN order_items oi ON oi.order_id = o.id \
                   INNER JOIN products p ON p.id = oi.product_id \
                   GROUP BY c.email HAVING SUM(oi.qty) > 10";
        let pattern = analyze(sql);

        assert_eq!(pattern.query_type, QueryType::ComplexJoin);
        assert_eq!(
            pattern.tables,
            vec!["customers", "orders", "order_items", "products"]
        );
        // 4 tables (+3), 3 joins (+3), group by (+1), having (+1)
        assert_eq!(pattern.complexity, Complexity::Complex);
        assert!(pattern.keywords.contains(&KeywordTag::Aggregation));
        assert_eq!(
            pattern
                .keywords
                .iter()
                .filter(|k| **k == KeywordTag::Aggregation)
                .count(),
            1
        );
    }

    #[test]
    fn test_subquery_instead_of_join() {
        let pattern = analyze(
            "SELECT name FROM customers WHERE id IN (SELECT customer_id FROM orders WHERE total > 100)",
        );

        assert!(pattern.has_anti_pattern(AntiPattern::SubqueryInsteadOfJoin));
        assert!(pattern.optimization_ops.contains(&OptimizationOp::ConvertToJoin));
        assert!(pattern.keywords.contains(&KeywordTag::Subqueries));
        // 2 tables (+1) and one sub-select (+2)
        assert_eq!(pattern.complexity, Complexity::Medium);
    }

    #[test]
    fn test_function_in_where() {
        let pattern = analyze("SELECT id FROM orders WHERE YEAR(created_at) = 2024");
        assert!(pattern.has_anti_pattern(AntiPattern::FunctionInWhere));
        assert!(pattern
            .optimization_ops
            .contains(&OptimizationOp::MoveFunctionsToSelect));

        let pattern = analyze("SELECT UPPER(name) FROM orders WHERE id = 5");
        assert!(!pattern.has_anti_pattern(AntiPattern::FunctionInWhere));

        let pattern =
            analyze("SELECT id FROM orders WHERE status = 'paid' AND YEAR(created_at) = 2024");
        assert!(pattern.has_anti_pattern(AntiPattern::FunctionInWhere));

        let pattern = analyze(
            "SELECT dept, COUNT(*) FROM emp WHERE salary > 10 GROUP BY dept HAVING COUNT(*) > 5",
        );
        assert!(!pattern.has_anti_pattern(AntiPattern::FunctionInWhere));
    }

    #[test]
    fn test_table_casing_and_dedup() {
        let pattern = analyze("select * from Orders o join Customers c on o.cid = c.id join Orders o2 on 1=1");
        assert_eq!(pattern.tables, vec!["Orders", "Customers"]);
    }

    #[test]
    fn test_derived_table_commas_are_not_cartesian() {
        let pattern = analyze("SELECT x.a FROM (SELECT a, b FROM t) x WHERE x.a = 1");
        assert!(!pattern.has_anti_pattern(AntiPattern::CartesianJoin));
    }

    #[test]
    fn test_malformed_input_degrades_gracefully() {
        for sql in ["", "   ", "this is not sql", ";;;(((", "SELEC FORM"] {
            let pattern = analyze(sql);
            assert_eq!(pattern.query_type, QueryType::BasicSelect);
            assert_eq!(pattern.complexity, Complexity::Simple);
            assert!(pattern.anti_patterns.is_empty());
            assert!(pattern.tables.is_empty());
        }
    }

    #[test]
    fn test_index_hint_suppresses_where_index_suggestion() {
        let pattern = analyze("SELECT id FROM t USE INDEX (idx_a) WHERE a = 1");
        assert!(!pattern
            .optimization_ops
            .contains(&OptimizationOp::IndexWhereColumns));
        assert!(pattern.keywords.contains(&KeywordTag::Indexes));
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let statements = [
            "SELECT * FROM a JOIN b ON a.id = b.id JOIN c ON c.id = b.id ORDER BY a.x",
            "SELECT DISTINCT city FROM customers WHERE email LIKE '%@x.com' UNION SELECT 'n/a'",
            "SELECT COUNT(*) FROM t WHERE EXISTS (SELECT 1 FROM u WHERE u.t_id = t.id)",
        ];
        for sql in statements {
            let first = analyze(sql);
            for _ in 0..5 {
                assert_eq!(analyze(sql), first);
            }
        }
    }

    #[test]
    fn test_pattern_json_shape() {
        let pattern = analyze("SELECT * FROM products");
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["type"], "full-select");
        assert_eq!(json["complexity"], "simple");
        assert_eq!(json["anti_patterns"][0], "select-star");
        assert_eq!(json["optimization_opportunities"][0], "specify-columns");

        let back: QueryPattern = serde_json::from_value(json).unwrap();
        assert_eq!(back, pattern);
    }
}
