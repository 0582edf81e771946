//! Heuristic confidence scoring for generated rewrites

use super::response::ParsedResponse;
use crate::analyze::{Complexity, QueryPattern};

const BASE_SCORE: f64 = 0.5;
const MIN_SCORE: f64 = 0.1;
const MAX_SCORE: f64 = 1.0;

type Signal = fn(&QueryPattern, &ParsedResponse) -> bool;

/// Additive signals; each matching rule contributes its weight
const SIGNALS: &[(Signal, f64)] = &[
    (|p, _| !p.anti_patterns.is_empty(), 0.2),
    (|p, _| p.optimization_ops.len() > 2, 0.15),
    (|_, r| r.rationale.chars().count() > 50, 0.1),
    (|_, r| r.expected_plan_change.chars().count() > 50, 0.1),
    (|_, r| r.proposed_sql.to_lowercase().contains("index"), 0.05),
];

fn complexity_adjustment(complexity: Complexity) -> f64 {
    match complexity {
        Complexity::Simple => 0.3,
        Complexity::Medium => 0.1,
        Complexity::Complex => -0.1,
    }
}

/// Score a rewrite in `[0.1, 1.0]`
pub fn confidence_score(pattern: &QueryPattern, response: &ParsedResponse) -> f64 {
    let score = SIGNALS
        .iter()
        .filter(|(signal, _)| signal(pattern, response))
        .fold(
            BASE_SCORE + complexity_adjustment(pattern.complexity),
            |acc, (_, weight)| acc + weight,
        );
    score.clamp(MIN_SCORE, MAX_SCORE)
}
