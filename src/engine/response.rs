//! Parsing of the four-section generator response

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static SQL_BLOCK_RE: OnceLock<Regex> = OnceLock::new();

fn sql_block_re() -> &'static Regex {
    SQL_BLOCK_RE.get_or_init(|| {
        Regex::new(r"(?s)PROPOSED_SQL:\s*```(?:sql)?[ \t]*\n?(.*?)```")
            .expect("proposed SQL pattern is valid")
    })
}

const MARKERS: &[&str] = &[
    "PROPOSED_SQL:",
    "RATIONALE:",
    "EXPECTED_PLAN_CHANGE:",
    "CAVEATS:",
];

const BULLETS: &[&str] = &["• ", "- ", "* "];

/// Structured fields pulled out of a completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub proposed_sql: String,
    pub rationale: String,
    pub expected_plan_change: String,
    pub caveats: String,
}

/// Extract the response contract from generated text.
///
/// Only the fenced `PROPOSED_SQL` block is required; missing prose sections
/// come back empty.
pub fn parse_response(text: &str) -> Result<ParsedResponse> {
    let proposed_sql = sql_block_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|sql| !sql.is_empty())
        .ok_or_else(|| Error::Parse("could not extract optimized SQL".to_string()))?;

    Ok(ParsedResponse {
        proposed_sql,
        rationale: extract_section(text, "RATIONALE:"),
        expected_plan_change: extract_section(text, "EXPECTED_PLAN_CHANGE:"),
        caveats: extract_section(text, "CAVEATS:"),
    })
}

/// Text after `marker` up to the first blank line or the next section
/// marker, with bullets stripped and lines joined by single spaces
fn extract_section(text: &str, marker: &str) -> String {
    let Some((_, rest)) = text.split_once(marker) else {
        return String::new();
    };

    let mut parts = Vec::new();
    for line in rest.trim_start().lines() {
        let line = line.trim();
        if line.is_empty() || MARKERS.iter().any(|m| line.starts_with(m)) {
            break;
        }
        let line = BULLETS
            .iter()
            .find_map(|b| line.strip_prefix(b))
            .unwrap_or(line)
            .trim();
        if !line.is_empty() {
            parts.push(line);
        }
    }
    parts.join(" ")
}
