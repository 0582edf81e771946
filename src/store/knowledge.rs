//! Knowledge-base seed content
//!
//! A curated set of TiDB tuning notes ships with the binary. Additional
//! documents can be loaded from a TOML file of the form:
//!
//! ```toml
//! [[documents]]
//! title = "Covering Indexes"
//! category = "indexes"
//! url = "https://example.com/covering"
//! content = "..."
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A document to be added to the knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInput {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl DocumentInput {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: category.into(),
            url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct KnowledgeFile {
    #[serde(default)]
    documents: Vec<DocumentInput>,
}

/// Parse a TOML knowledge file
pub fn parse_knowledge_file(contents: &str) -> Result<Vec<DocumentInput>> {
    let file: KnowledgeFile = toml::from_str(contents)?;
    if let Some(doc) = file.documents.iter().find(|d| d.title.trim().is_empty()) {
        return Err(Error::InvalidInput(format!(
            "knowledge document in category '{}' has an empty title",
            doc.category
        )));
    }
    Ok(file.documents)
}

/// Read and parse a TOML knowledge file from disk
pub fn load_knowledge_file(path: &Path) -> Result<Vec<DocumentInput>> {
    let contents = std::fs::read_to_string(path)?;
    parse_knowledge_file(&contents)
}

struct Builtin {
    title: &'static str,
    category: &'static str,
    url: &'static str,
    content: &'static str,
}

const BUILTIN: &[Builtin] = &[
    Builtin {
        title: "TiDB Query Performance Optimization",
        category: "performance",
        url: "https://docs.pingcap.com/tidb/stable/sql-tuning-overview",
        content: "TiDB query optimization focuses on several key areas:

1. Index Usage: Ensure queries use appropriate indexes. Use EXPLAIN to check execution plans.
   - Create composite indexes for multi-column WHERE clauses
   - Consider covering indexes to avoid table lookups
   - Use prefix indexes for string columns when appropriate

2. JOIN Optimization:
   - Place tables with smaller result sets first in JOIN order
   - Use appropriate JOIN types (INNER, LEFT, etc.)
   - Consider using EXISTS instead of IN for subqueries
   - Avoid Cartesian products by ensuring proper JOIN conditions

3. WHERE Clause Optimization:
   - Push WHERE conditions as early as possible
   - Use indexed columns in WHERE clauses
   - Avoid functions in WHERE clauses that prevent index usage
   - Use LIMIT to reduce result sets when possible",
    },
    Builtin {
        title: "TiDB Index Best Practices",
        category: "indexes",
        url: "https://docs.pingcap.com/tidb/stable/best-practices-for-indexing",
        content: "TiDB indexing best practices:

1. Primary Key Design:
   - Use AUTO_RANDOM or UUID primary keys for write-heavy tables
   - Avoid hotspot issues with sequential inserts
   - Consider SHARD_ROW_ID_BITS for tables without a clustered key

2. Secondary Index Strategy:
   - Create indexes on frequently queried columns
   - Use composite indexes for multi-column queries
   - Order index columns by selectivity (most selective first)
   - Monitor index usage with EXPLAIN ANALYZE

3. Index Types:
   - B-tree indexes for range and equality queries
   - Expression indexes for computed columns
   - Invisible indexes to test the impact of dropping an index",
    },
    Builtin {
        title: "TiDB JOIN Optimization Techniques",
        category: "joins",
        url: "https://docs.pingcap.com/tidb/stable/join-reorder",
        content: "TiDB JOIN optimization techniques:

1. JOIN Reordering:
   - TiDB automatically reorders JOINs based on statistics
   - Use STRAIGHT_JOIN to force specific join order when needed
   - Ensure tables with smaller cardinality are joined first

2. JOIN Types:
   - Hash Join: Good for large datasets, one side fits in memory
   - Index Nested Loop Join: Efficient when outer table is small
   - Merge Join: Optimal when both tables are sorted on join keys

3. Optimization Tips:
   - Use EXISTS instead of IN for subqueries
   - Convert complex subqueries to JOINs when possible
   - Use appropriate indexes on join columns
   - Consider denormalization for frequently joined data",
    },
    Builtin {
        title: "TiDB Aggregation and GROUP BY Optimization",
        category: "aggregation",
        url: "https://docs.pingcap.com/tidb/stable/aggregation-optimization",
        content: "TiDB aggregation optimization:

1. GROUP BY Optimization:
   - Use indexes on GROUP BY columns
   - Order GROUP BY columns to match index order
   - Use covering indexes to avoid additional lookups
   - Consider pre-aggregating data in summary tables

2. Aggregate Functions:
   - COUNT(*) is optimized and should be preferred over COUNT(column)
   - Use APPROX_COUNT_DISTINCT for large datasets
   - Push aggregation down to the storage layer when possible
   - Use window functions for running totals and rankings

3. HAVING vs WHERE:
   - Use WHERE to filter before aggregation
   - Use HAVING only for post-aggregation filtering
   - Combine conditions efficiently to reduce data processing",
    },
    Builtin {
        title: "TiDB EXPLAIN ANALYZE and Query Plans",
        category: "analysis",
        url: "https://docs.pingcap.com/tidb/stable/explain-analyze",
        content: "Understanding TiDB EXPLAIN ANALYZE:

1. Reading Execution Plans:
   - execution_info shows actual runtime statistics
   - estRows and actRows compare estimated and actual row counts
   - time shows execution time for each operator
   - memory shows memory usage

2. Key Operators:
   - TableFullScan: Full table scan (may indicate missing index)
   - IndexRangeScan: Index-based range scan (generally good)
   - HashJoin/IndexJoin: Different join algorithms
   - Sort and TopN: Explicit sorting, TopN when a LIMIT applies
   - Projection: Column selection and transformation

3. Optimization Indicators:
   - Large estimate errors indicate stale statistics
   - Long execution times in specific operators show bottlenecks
   - Memory usage helps identify memory-intensive operations
   - Multiple table scans suggest missing indexes",
    },
    Builtin {
        title: "TiDB Query Hints and Optimizer Control",
        category: "hints",
        url: "https://docs.pingcap.com/tidb/stable/optimizer-hints",
        content: "TiDB optimizer hints for query control:

1. Index Hints:
   - USE_INDEX(table_name, index_name): Prefer an index
   - IGNORE_INDEX(table_name, index_name): Prevent index usage
   - FORCE INDEX (index_name): Strongly prefer index (MySQL syntax)

2. Join Hints:
   - HASH_JOIN(table_names): Force hash join
   - MERGE_JOIN(table_names): Force sort merge join
   - INL_JOIN(table_names): Force index nested loop join
   - STRAIGHT_JOIN: Disable join reordering

3. Other Optimizer Hints:
   - MAX_EXECUTION_TIME(N): Set query timeout
   - MEMORY_QUOTA(N MB): Control memory usage
   - SEMI_JOIN_REWRITE(): Rewrite EXISTS subqueries into joins",
    },
];

/// The curated documents shipped with sqlsage
pub fn builtin_documents() -> Vec<DocumentInput> {
    BUILTIN
        .iter()
        .map(|b| DocumentInput::new(b.title, b.content, b.category, Some(b.url.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_titles_are_unique() {
        let docs = builtin_documents();
        assert_eq!(docs.len(), 6);
        let titles: HashSet<_> = docs.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles.len(), docs.len());
        assert!(docs.iter().all(|d| d.url.is_some() && !d.content.is_empty()));
    }

    #[test]
    fn test_parse_knowledge_file() {
        let docs = parse_knowledge_file(
            r#"
            [[documents]]
            title = "Covering Indexes"
            category = "indexes"
            content = "Include every selected column in the index."

            [[documents]]
            title = "Top-N"
            category = "sorting"
            url = "https://example.com/topn"
            content = "ORDER BY with LIMIT becomes TopN."
            "#,
        )
        .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].url, None);
        assert_eq!(docs[1].url.as_deref(), Some("https://example.com/topn"));
    }

    #[test]
    fn test_parse_knowledge_file_rejects_blank_title() {
        let err = parse_knowledge_file(
            r#"
            [[documents]]
            title = "  "
            category = "misc"
            content = "x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        assert!(matches!(
            parse_knowledge_file("[[documents]]\ntitle = 3"),
            Err(Error::TomlParse(_))
        ));
    }
}
