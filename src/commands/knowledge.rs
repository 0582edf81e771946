//! Knowledge-base commands: seeding and search

use crate::config::Config;
use crate::embed::create_embedder;
use crate::error::Result;
use crate::meta::MetaDb;
use crate::store::{DocumentStore, SearchResult, SeedStats};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Query used to sanity-check retrieval right after seeding
pub const PROBE_QUERY: &str = "SQL query optimization performance";

/// Build a document store with the configured embedding backend
pub fn open_store(config: &Config, db: &MetaDb) -> Result<DocumentStore> {
    let embedder = create_embedder(&config.embedding)?;
    Ok(DocumentStore::from_config(
        config,
        db.clone(),
        Arc::from(embedder),
    ))
}

/// Result of a seed-docs run
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub builtin: SeedStats,
    pub file: Option<SeedStats>,
    pub probe_query: String,
    pub probe_results: Vec<SearchResult>,
}

/// Seed the built-in documents plus any from `file`, then run a probe search
pub async fn cmd_seed_docs(config: &Config, db: &MetaDb, file: Option<&Path>) -> Result<SeedReport> {
    let store = open_store(config, db)?;

    info!("Seeding built-in knowledge base");
    let builtin = store.seed_builtin().await?;

    let file = match file {
        Some(path) => Some(store.seed_file(path).await?),
        None => None,
    };

    let probe_results = store.search(PROBE_QUERY, config.retrieval.top_k).await?;

    Ok(SeedReport {
        builtin,
        file,
        probe_query: PROBE_QUERY.to_string(),
        probe_results,
    })
}

/// Results of a knowledge-base search
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub results: Vec<SearchResult>,
}

pub async fn cmd_search(
    config: &Config,
    db: &MetaDb,
    query: &str,
    limit: usize,
) -> Result<SearchReport> {
    let store = open_store(config, db)?;
    let results = store.search(query, limit).await?;
    Ok(SearchReport {
        query: query.to_string(),
        results,
    })
}

fn print_results(results: &[SearchResult]) {
    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. [score: {:.3}] {} ({})",
            i + 1,
            r.score,
            r.document,
            r.category
        );
        if let Some(url) = &r.url {
            println!("   {}", url);
        }

        let text = r.text.trim();
        let preview = match text.char_indices().nth(200) {
            Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
            None => text.to_string(),
        };
        println!("   {}\n", preview.replace('\n', " "));
    }
}

pub fn print_seed_report(report: &SeedReport) {
    println!("\n✓ Knowledge base seeded");
    println!(
        "  Built-in documents: {} ({} chunks)",
        report.builtin.documents, report.builtin.chunks
    );
    if let Some(file) = &report.file {
        println!(
            "  File documents: {} ({} chunks)",
            file.documents, file.chunks
        );
    }

    println!("\n🔍 Probe: {}\n", report.probe_query);
    if report.probe_results.is_empty() {
        println!("No passages within the distance threshold.");
    } else {
        print_results(&report.probe_results);
    }
}

pub fn print_search_report(report: &SearchReport) {
    println!("\n🔍 Query: {}\n", report.query);
    println!("Found {} results:\n", report.results.len());
    print_results(&report.results);
}
