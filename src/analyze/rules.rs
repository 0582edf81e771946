//! Rule tables for SQL classification
//!
//! Every rule is a predicate over [`SqlFeatures`], a lowercased and
//! whitespace-normalized view of the statement computed once per analysis.

use super::{AntiPattern, Complexity, KeywordTag, OptimizationOp, QueryType};
use regex::Regex;
use std::sync::OnceLock;

static JOIN_RE: OnceLock<Regex> = OnceLock::new();
static SUBSELECT_RE: OnceLock<Regex> = OnceLock::new();
static FUNCTION_COMPARISON_RE: OnceLock<Regex> = OnceLock::new();
static WHERE_CLAUSE_RE: OnceLock<Regex> = OnceLock::new();
static FROM_CLAUSE_RE: OnceLock<Regex> = OnceLock::new();

fn join_re() -> &'static Regex {
    JOIN_RE.get_or_init(|| {
        Regex::new(r"\b(?:inner\s+join|left\s+join|right\s+join|full\s+join|join)\b")
            .expect("join pattern is valid")
    })
}

fn subselect_re() -> &'static Regex {
    SUBSELECT_RE.get_or_init(|| Regex::new(r"\(\s*select\b").expect("sub-select pattern is valid"))
}

fn function_comparison_re() -> &'static Regex {
    FUNCTION_COMPARISON_RE.get_or_init(|| {
        Regex::new(r"\b[a-z_][a-z0-9_]*\s*\([^)]*\)\s*(?:=|<|>|!=)")
            .expect("function-comparison pattern is valid")
    })
}

fn where_clause_re() -> &'static Regex {
    WHERE_CLAUSE_RE.get_or_init(|| {
        Regex::new(
            r"\bwhere\s+(.*?)(?:\bgroup\s+by\b|\bhaving\b|\border\s+by\b|\blimit\b|\bunion\b|;|$)",
        )
        .expect("where-clause pattern is valid")
    })
}

fn from_clause_re() -> &'static Regex {
    FROM_CLAUSE_RE.get_or_init(|| {
        Regex::new(
            r"\bfrom\s+([^()]*?)(?:\bwhere\b|\bgroup\s+by\b|\border\s+by\b|\bhaving\b|\blimit\b|\bunion\b|\)|;|$)",
        )
        .expect("from-clause pattern is valid")
    })
}

/// Precomputed view of a statement shared by all rules
#[derive(Debug, Clone)]
pub struct SqlFeatures {
    /// Lowercased statement with whitespace runs collapsed to one space
    pub normalized: String,
    pub join_count: usize,
    pub subselect_count: usize,
    pub table_count: usize,
}

impl SqlFeatures {
    pub fn new(sql: &str, table_count: usize) -> Self {
        let normalized = normalize(sql);
        let join_count = join_re().find_iter(&normalized).count();
        let subselect_count = subselect_re().find_iter(&normalized).count();
        Self {
            normalized,
            join_count,
            subselect_count,
            table_count,
        }
    }

    /// Token presence with word boundaries on the alphanumeric ends of `needle`
    pub fn has(&self, needle: &str) -> bool {
        contains_token(&self.normalized, needle)
    }

    fn lacks_limit(&self) -> bool {
        !self.has("limit")
    }

    fn has_comma_from_list(&self) -> bool {
        from_clause_re()
            .captures_iter(&self.normalized)
            .filter_map(|caps| caps.get(1))
            .any(|clause| clause.as_str().contains(','))
    }

    /// A function call compared with `=`, `<`, `>` or `!=` inside a WHERE
    /// clause. HAVING and later clauses are not part of the search.
    fn has_function_in_where(&self) -> bool {
        where_clause_re()
            .captures_iter(&self.normalized)
            .filter_map(|caps| caps.get(1))
            .any(|clause| function_comparison_re().is_match(clause.as_str()))
    }
}

/// Lowercase and collapse whitespace
pub fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Substring search that refuses matches glued to neighbouring identifier
/// characters, so "where" does not match inside "somewhere"
pub fn contains_token(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    let check_left = needle.as_bytes().first().copied().is_some_and(is_word_byte);
    let check_right = needle.as_bytes().last().copied().is_some_and(is_word_byte);

    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let left_ok = !check_left || start == 0 || !is_word_byte(bytes[start - 1]);
        let right_ok = !check_right || end == bytes.len() || !is_word_byte(bytes[end]);
        left_ok && right_ok
    })
}

type Predicate = fn(&SqlFeatures) -> bool;

/// Ordered type rules; the first matching predicate decides the type
pub const TYPE_RULES: &[(Predicate, QueryType)] = &[
    (
        |f| f.normalized.contains("sleep(") || f.normalized.contains("sleep ("),
        QueryType::SleepTest,
    ),
    (|f| f.join_count >= 3, QueryType::ComplexJoin),
    (|f| f.join_count >= 1, QueryType::SimpleJoin),
    (|f| f.has("group by"), QueryType::Aggregation),
    // A wildcard search sorted by some column is still a search
    (|f| f.has("like") && f.normalized.contains('%'), QueryType::PatternSearch),
    (|f| f.has("order by"), QueryType::Aggregation),
    (|f| f.has("select *"), QueryType::FullSelect),
    (|f| f.has("where"), QueryType::FilteredSelect),
];

/// Independent anti-pattern checks, reported in table order
pub const ANTI_PATTERN_RULES: &[(Predicate, AntiPattern)] = &[
    (|f| f.has("select *"), AntiPattern::SelectStar),
    (|f| f.normalized.contains("like '%"), AntiPattern::LeadingWildcardLike),
    (
        |f| (f.has("join") || f.has("order by")) && f.lacks_limit(),
        AntiPattern::MissingLimit,
    ),
    (
        |f| !f.has("join") && f.has_comma_from_list(),
        AntiPattern::CartesianJoin,
    ),
    (
        |f| f.has_function_in_where(),
        AntiPattern::FunctionInWhere,
    ),
    (
        |f| f.subselect_count > 0 && f.has("in ("),
        AntiPattern::SubqueryInsteadOfJoin,
    ),
    (
        |f| f.has("order by") && f.lacks_limit(),
        AntiPattern::OrderWithoutLimit,
    ),
];

/// Structural opportunities added after the per-anti-pattern techniques
pub const STRUCTURAL_OP_RULES: &[(Predicate, OptimizationOp)] = &[
    (|f| f.has("group by"), OptimizationOp::IndexGroupByColumns),
    (|f| f.has("join"), OptimizationOp::IndexJoinColumns),
    (
        |f| f.has("where") && !f.has("index"),
        OptimizationOp::IndexWhereColumns,
    ),
];

/// Literal tokens and the category tag each one contributes
pub const KEYWORD_RULES: &[(&str, KeywordTag)] = &[
    ("join", KeywordTag::Joins),
    ("index", KeywordTag::Indexes),
    ("group by", KeywordTag::Aggregation),
    ("order by", KeywordTag::Sorting),
    ("limit", KeywordTag::Limiting),
    ("where", KeywordTag::Filtering),
    ("having", KeywordTag::Aggregation),
    ("distinct", KeywordTag::Deduplication),
    ("union", KeywordTag::SetOperations),
    ("exists", KeywordTag::Subqueries),
    ("in (", KeywordTag::Subqueries),
    ("like", KeywordTag::PatternMatching),
];

/// Additive complexity score; see [`complexity_for_score`] for the bands
pub fn complexity_score(f: &SqlFeatures) -> u32 {
    let mut score = 0u32;

    if f.table_count >= 4 {
        score += 3;
    } else if f.table_count >= 2 {
        score += 1;
    }

    score += f.join_count as u32;
    score += 2 * f.subselect_count as u32;

    if f.has("group by") {
        score += 1;
    }
    if f.has("having") {
        score += 1;
    }
    if f.has("window") || f.has("over(") || f.has("over (") {
        score += 2;
    }
    if f.has("union") {
        score += 2;
    }

    score
}

pub fn complexity_for_score(score: u32) -> Complexity {
    if score >= 6 {
        Complexity::Complex
    } else if score >= 3 {
        Complexity::Medium
    } else {
        Complexity::Simple
    }
}
