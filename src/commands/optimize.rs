//! Analysis, optimization, and review commands

use super::knowledge::open_store;
use crate::analyze::{analyze, QueryPattern};
use crate::config::Config;
use crate::engine::{OptimizationEngine, OptimizationResult};
use crate::error::{Error, Result};
use crate::generate::create_generator;
use crate::meta::MetaDb;
use std::path::Path;
use std::sync::Arc;

/// Wire the full pipeline from configuration
pub fn open_engine(config: &Config, db: &MetaDb) -> Result<OptimizationEngine> {
    let store = open_store(config, db)?;
    let generator = create_generator(&config.generator)?;
    Ok(OptimizationEngine::from_config(
        config,
        db.clone(),
        Arc::new(store),
        Arc::from(generator),
    ))
}

/// Resolve the statement to optimize from `--sql` or `--file`
pub fn read_sql_input(sql: Option<String>, file: Option<&Path>) -> Result<String> {
    let sql = match (sql, file) {
        (Some(sql), None) => sql,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        _ => {
            return Err(Error::InvalidInput(
                "provide exactly one of --sql or --file".to_string(),
            ))
        }
    };

    let sql = sql.trim().to_string();
    if sql.is_empty() {
        return Err(Error::InvalidInput("SQL statement is empty".to_string()));
    }
    Ok(sql)
}

pub fn cmd_analyze(sql: &str) -> QueryPattern {
    analyze(sql)
}

pub async fn cmd_optimize(
    engine: &OptimizationEngine,
    slow_query_id: i64,
    sql: &str,
) -> Result<OptimizationResult> {
    engine.optimize_query(slow_query_id, sql).await
}

pub async fn cmd_pending(engine: &OptimizationEngine, limit: usize) -> Result<Vec<OptimizationResult>> {
    engine.list_pending(limit).await
}

pub async fn cmd_show(engine: &OptimizationEngine, id: i64) -> Result<OptimizationResult> {
    engine.get_by_id(id).await
}

/// Accept a pending rewrite and return its updated record
pub async fn cmd_accept(engine: &OptimizationEngine, id: i64) -> Result<OptimizationResult> {
    engine.accept(id).await?;
    engine.get_by_id(id).await
}

/// Reject a pending rewrite and return its updated record
pub async fn cmd_reject(engine: &OptimizationEngine, id: i64) -> Result<OptimizationResult> {
    engine.reject(id).await?;
    engine.get_by_id(id).await
}

fn join_or_none<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_pattern(pattern: &QueryPattern) {
    println!("Query Type: {}", pattern.query_type);
    println!("Complexity: {}", pattern.complexity);
    println!("Tables: {}", join_or_none(&pattern.tables));
    println!("Anti-patterns: {}", join_or_none(&pattern.anti_patterns));
    println!(
        "Optimization Ops: {}",
        join_or_none(&pattern.optimization_ops)
    );
    println!("Keywords: {}", join_or_none(&pattern.keywords));
}

pub fn print_optimization(result: &OptimizationResult) {
    println!(
        "\n🛠  Optimization #{} (slow query {})\n",
        result.id, result.slow_query_id
    );
    println!("Status: {}", result.status);
    println!("Confidence: {:.2}", result.confidence);
    println!("Model: {}", result.model);
    println!("Created: {}", result.created_at);
    if let Some(reviewed_at) = &result.reviewed_at {
        println!("Reviewed: {}", reviewed_at);
    }
    println!();
    print_pattern(&result.pattern);

    println!("\nOriginal SQL:\n{}", result.original_sql);
    println!("\nOptimized SQL:\n{}", result.optimized_sql);
    if !result.rationale.is_empty() {
        println!("\nRationale:\n{}", result.rationale);
    }
    if !result.expected_plan_change.is_empty() {
        println!("\nExpected Plan Change:\n{}", result.expected_plan_change);
    }
    if !result.caveats.is_empty() {
        println!("\nCaveats:\n{}", result.caveats);
    }
}

pub fn print_pending(results: &[OptimizationResult]) {
    if results.is_empty() {
        println!("No pending optimizations.");
        return;
    }

    println!("\n📋 Pending optimizations ({})\n", results.len());
    for r in results {
        let first_line = r.optimized_sql.lines().next().unwrap_or_default();
        println!(
            "#{:<5} [{:.2}] slow query {} · {} · {}",
            r.id, r.confidence, r.slow_query_id, r.pattern.query_type, r.created_at
        );
        println!("       {}", first_line);
    }
}
