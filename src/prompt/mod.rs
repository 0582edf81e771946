//! Retrieval-augmented prompt construction
//!
//! A prompt is assembled from the analyzer's profile, the original
//! statement, and up to `top_k` knowledge passages retrieved with a search
//! query derived from that profile. The response format section is a fixed
//! contract that [`crate::engine`] parses back.

use crate::analyze::{AntiPattern, QueryPattern, QueryType};
use crate::error::{Error, Result};
use crate::store::{DocumentStore, SearchResult};
use std::sync::Arc;
use tracing::debug;

/// Search phrase for the primary query type
fn type_phrase(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::ComplexJoin | QueryType::SimpleJoin => "JOIN optimization performance",
        QueryType::Aggregation => "GROUP BY aggregation optimization",
        QueryType::PatternSearch => "LIKE pattern search index optimization",
        QueryType::FullSelect => "SELECT * column projection optimization",
        _ => "SQL query optimization performance",
    }
}

/// Search phrase for a detected anti-pattern
fn anti_pattern_phrase(anti_pattern: AntiPattern) -> &'static str {
    match anti_pattern {
        AntiPattern::LeadingWildcardLike => "wildcard LIKE index",
        AntiPattern::CartesianJoin => "Cartesian product JOIN",
        AntiPattern::MissingLimit => "LIMIT result set",
        AntiPattern::SubqueryInsteadOfJoin => "subquery JOIN conversion",
        AntiPattern::SelectStar => "SELECT * column projection",
        AntiPattern::FunctionInWhere => "function WHERE index usage",
        AntiPattern::OrderWithoutLimit => "ORDER BY LIMIT top-N",
    }
}

/// Closing guidance bullets for the primary query type
fn focus_bullets(query_type: QueryType) -> &'static [&'static str] {
    match query_type {
        QueryType::ComplexJoin | QueryType::SimpleJoin => &[
            "Optimize JOIN order and algorithms",
            "Ensure proper index usage on join columns",
            "Consider converting subqueries to JOINs",
        ],
        QueryType::Aggregation => &[
            "Optimize GROUP BY and ORDER BY performance",
            "Use appropriate indexes for aggregation",
            "Consider pre-filtering with WHERE clauses",
        ],
        QueryType::PatternSearch => &[
            "Optimize LIKE patterns for index usage",
            "Avoid leading wildcards when possible",
            "Consider full-text search alternatives",
        ],
        QueryType::SleepTest => &[
            "Remove artificial delays (SLEEP functions)",
            "Replace with efficient query patterns",
            "Ensure minimal resource usage",
        ],
        _ => &[
            "Apply general SQL optimization principles",
            "Focus on index usage and query structure",
            "Minimize data processing overhead",
        ],
    }
}

const RESPONSE_FORMAT: &str = "FORMAT YOUR RESPONSE EXACTLY AS FOLLOWS:

PROPOSED_SQL:
```sql
[Your optimized query here]
```

RATIONALE:
• [Primary optimization applied]
• [Secondary improvements made]
• [Why this approach was chosen]

EXPECTED_PLAN_CHANGE:
• [Index usage improvements]
• [Join order optimizations]
• [Row reduction techniques]

CAVEATS:
• [Any semantic differences]
• [Performance assumptions made]
• [Edge cases to monitor]

";

/// Derive the knowledge-base search query for a profile
pub fn build_search_query(pattern: &QueryPattern) -> String {
    let mut parts: Vec<String> = vec![type_phrase(pattern.query_type).to_string()];
    parts.extend(
        pattern
            .anti_patterns
            .iter()
            .map(|ap| anti_pattern_phrase(*ap).to_string()),
    );
    parts.extend(
        pattern
            .keywords
            .iter()
            .map(|kw| format!("{} optimization", kw)),
    );
    parts.join(" ")
}

fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the full prompt text
pub fn render_prompt(
    flavor: &str,
    sql: &str,
    pattern: &QueryPattern,
    context: &[SearchResult],
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are a {} performance expert specializing in SQL optimization. \
         Analyze the provided slow query and suggest concrete optimizations.\n\n",
        flavor
    ));

    prompt.push_str("SLOW QUERY ANALYSIS:\n");
    prompt.push_str(&format!("Query Type: {}\n", pattern.query_type));
    prompt.push_str(&format!("Complexity: {}\n", pattern.complexity));
    prompt.push_str(&format!("Tables: {}\n", pattern.tables.join(", ")));
    if !pattern.anti_patterns.is_empty() {
        prompt.push_str(&format!(
            "Anti-patterns detected: {}\n",
            join_display(&pattern.anti_patterns)
        ));
    }
    if !pattern.optimization_ops.is_empty() {
        prompt.push_str(&format!(
            "Optimization opportunities: {}\n",
            join_display(&pattern.optimization_ops)
        ));
    }
    prompt.push('\n');

    prompt.push_str("ORIGINAL QUERY:\n```sql\n");
    prompt.push_str(sql);
    prompt.push_str("\n```\n\n");

    if !context.is_empty() {
        prompt.push_str(&format!(
            "RELEVANT {} OPTIMIZATION KNOWLEDGE:\n",
            flavor.to_uppercase()
        ));
        for (i, result) in context.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. {} ({})\n   {}\n\n",
                i + 1,
                result.document,
                result.category,
                result.text
            ));
        }
    }

    prompt.push_str("INSTRUCTIONS:\n");
    prompt.push_str(&format!(
        "Based on the query analysis and {} optimization knowledge above, provide a comprehensive optimization.\n",
        flavor
    ));
    prompt.push_str("Focus on the detected anti-patterns and optimization opportunities.\n\n");

    prompt.push_str(RESPONSE_FORMAT);

    prompt.push_str("OPTIMIZATION FOCUS:\n");
    for bullet in focus_bullets(pattern.query_type) {
        prompt.push_str(&format!("- {}\n", bullet));
    }

    prompt
}

/// Builds optimization prompts backed by a [`DocumentStore`]
pub struct PromptBuilder {
    store: Arc<DocumentStore>,
    top_k: usize,
    flavor: String,
}

impl PromptBuilder {
    pub fn new(store: Arc<DocumentStore>, top_k: usize, flavor: impl Into<String>) -> Self {
        Self {
            store,
            top_k,
            flavor: flavor.into(),
        }
    }

    /// Retrieve context for `pattern` and render the prompt.
    ///
    /// Any retrieval failure is returned as [`Error::Retrieval`].
    pub async fn build(&self, sql: &str, pattern: &QueryPattern) -> Result<String> {
        let search_query = build_search_query(pattern);
        debug!(search_query = %search_query, "Retrieving optimization context");

        let context = self
            .store
            .search(&search_query, self.top_k)
            .await
            .map_err(|e| Error::Retrieval(Box::new(e)))?;

        debug!(passages = context.len(), "Retrieved optimization context");
        Ok(render_prompt(&self.flavor, sql, pattern, &context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyze;
    use crate::embed::{Embedder, MockEmbedder};
    use crate::store::tests::{store_with, TopicEmbedder};
    use crate::store::DocumentInput;
    use async_trait::async_trait;

    const JOIN_SQL: &str =
        "SELECT * FROM customers c JOIN orders o ON c.id=o.customer_id WHERE c.city='Paris'";

    #[test]
    fn test_search_query_for_join_profile() {
        let pattern = analyze(JOIN_SQL);
        let query = build_search_query(&pattern);

        assert!(query.starts_with("JOIN optimization performance"));
        assert!(query.contains("LIMIT result set"));
        assert!(query.contains("SELECT * column projection"));
        assert!(query.contains("joins optimization"));
    }

    #[test]
    fn test_search_query_for_pattern_search() {
        let pattern =
            analyze("SELECT id,name FROM products WHERE name LIKE '%widget%' ORDER BY created_at");
        let query = build_search_query(&pattern);

        assert!(query.starts_with("LIKE pattern search index optimization"));
        assert!(query.contains("wildcard LIKE index"));
        assert!(query.contains("ORDER BY LIMIT top-N"));
    }

    #[test]
    fn test_search_query_default_phrase() {
        let pattern = analyze("SELECT 1");
        assert!(build_search_query(&pattern).starts_with("SQL query optimization performance"));
    }

    #[test]
    fn test_render_sections_in_order() {
        let pattern = analyze(JOIN_SQL);
        let context = vec![SearchResult {
            document: "TiDB JOIN Optimization Techniques".to_string(),
            category: "joins".to_string(),
            url: None,
            chunk_index: 0,
            text: "Hash Join: Good for large datasets".to_string(),
            distance: 0.2,
            score: 0.8,
        }];
        let prompt = render_prompt("TiDB", JOIN_SQL, &pattern, &context);

        let markers = [
            "You are a TiDB performance expert",
            "SLOW QUERY ANALYSIS:",
            "Query Type: simple-join",
            "Complexity: simple",
            "Tables: customers, orders",
            "Anti-patterns detected:",
            "ORIGINAL QUERY:\n```sql\nSELECT * FROM customers",
            "RELEVANT TIDB OPTIMIZATION KNOWLEDGE:\n1. TiDB JOIN Optimization Techniques (joins)\n   Hash Join",
            "INSTRUCTIONS:",
            "PROPOSED_SQL:",
            "RATIONALE:",
            "EXPECTED_PLAN_CHANGE:",
            "CAVEATS:",
            "OPTIMIZATION FOCUS:\n- Optimize JOIN order and algorithms",
        ];
        let mut cursor = 0;
        for marker in markers {
            let pos = prompt[cursor..]
                .find(marker)
                .unwrap_or_else(|| panic!("missing or out of order: {marker}"));
            cursor += pos + marker.len();
        }
    }

    #[test]
    fn test_render_without_context_or_anti_patterns() {
        let pattern = analyze("SELECT id FROM t WHERE id = 1 LIMIT 1");
        let prompt = render_prompt("MySQL", "SELECT id FROM t WHERE id = 1 LIMIT 1", &pattern, &[]);

        assert!(prompt.starts_with("You are a MySQL performance expert"));
        assert!(!prompt.contains("OPTIMIZATION KNOWLEDGE"));
        assert!(!prompt.contains("Anti-patterns detected"));
        assert!(prompt.contains("- Apply general SQL optimization principles"));
    }

    #[tokio::test]
    async fn test_build_includes_retrieved_passages() {
        let (store, _db, _tmp) = store_with(Arc::new(TopicEmbedder), 1000).await;
        store
            .add_or_update_document(&DocumentInput::new(
                "Join Guide",
                "join join order",
                "joins",
                None,
            ))
            .await
            .unwrap();

        let builder = PromptBuilder::new(Arc::new(store), 3, "TiDB");
        let prompt = builder.build(JOIN_SQL, &analyze(JOIN_SQL)).await.unwrap();
        assert!(prompt.contains("1. Join Guide (joins)\n   join join order"));
    }

    #[tokio::test]
    async fn test_build_with_empty_store_has_no_knowledge_section() {
        let (store, _db, _tmp) = store_with(Arc::new(MockEmbedder::new(32)), 400).await;
        let builder = PromptBuilder::new(Arc::new(store), 3, "TiDB");
        let prompt = builder.build("SELECT 1", &analyze("SELECT 1")).await.unwrap();
        assert!(!prompt.contains("RELEVANT TIDB OPTIMIZATION KNOWLEDGE"));
    }

    #[tokio::test]
    async fn test_build_wraps_search_failure() {
        struct DownEmbedder;

        #[async_trait]
        impl Embedder for DownEmbedder {
            async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
                Err(Error::Embedding("connection refused".to_string()))
            }
            fn dimension(&self) -> usize {
                4
            }
            fn model_name(&self) -> &str {
                "down"
            }
        }

        let (store, _db, _tmp) = store_with(Arc::new(DownEmbedder), 400).await;
        let builder = PromptBuilder::new(Arc::new(store), 3, "TiDB");
        let err = builder.build(JOIN_SQL, &analyze(JOIN_SQL)).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
        assert!(err.is_collaborator_failure());
    }
}
