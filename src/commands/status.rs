//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::meta::{GlobalStats, MetaDb};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub generator_provider: String,
    pub generator_model: String,
    pub database_flavor: String,
    pub db_stats: GlobalStats,
}

/// Get system status
pub async fn cmd_status(config: &Config, db: &MetaDb) -> Result<StatusInfo> {
    info!("Getting status");

    let db_stats = db.get_global_stats().await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        embedding_provider: config.embedding.provider.clone(),
        embedding_model: config.embedding.model.clone(),
        embedding_dimension: config.embedding.dimension,
        generator_provider: config.generator.provider.clone(),
        generator_model: config.generator.model.clone(),
        database_flavor: config.prompt.database_flavor.clone(),
        db_stats,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 sqlsage Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("Target: {}", status.database_flavor);

    println!("\nEmbedding:");
    println!(
        "  {} / {} ({} dims)",
        status.embedding_provider, status.embedding_model, status.embedding_dimension
    );
    println!("\nGenerator:");
    println!("  {} / {}", status.generator_provider, status.generator_model);

    println!("\nKnowledge Base:");
    println!("  Documents: {}", status.db_stats.document_count);
    println!("  Chunks: {}", status.db_stats.chunk_count);

    println!("\nOptimizations:");
    println!("  Pending: {}", status.db_stats.pending_rewrites);
    println!("  Accepted: {}", status.db_stats.accepted_rewrites);
    println!("  Rejected: {}", status.db_stats.rejected_rewrites);

    if status.db_stats.document_count == 0 {
        println!("\nThe knowledge base is empty. Run 'sqlsage seed-docs' to load it.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_on_fresh_database() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        let db = MetaDb::new(&config.paths.db_file).await.unwrap();

        let status = cmd_status(&config, &db).await.unwrap();
        assert_eq!(status.db_stats, GlobalStats::default());
        assert_eq!(status.embedding_provider, "mock");
        assert_eq!(status.database_flavor, "TiDB");
        assert!(status.db_path.ends_with("sqlsage.db"));
    }
}
