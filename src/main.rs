//! sqlsage CLI entry point

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sqlsage::{
    commands::{
        cmd_accept, cmd_analyze, cmd_init, cmd_optimize, cmd_pending, cmd_reject, cmd_search,
        cmd_seed_docs, cmd_show, cmd_status, open_engine, print_optimization, print_pattern,
        print_pending, print_search_report, print_seed_report, print_status, read_sql_input,
    },
    config::Config,
    meta::MetaDb,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sqlsage")]
#[command(version, about = "Retrieval-augmented rewrite suggestions for slow SQL", long_about = None)]
struct Cli {
    /// Path to config file (or base directory for init)
    #[arg(short, long, global = true, env = "SQLSAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Load the built-in tuning notes into the knowledge base
    SeedDocs {
        /// Additional TOML file of [[documents]] to seed
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Similarity search over the knowledge base
    Search {
        /// The search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Print the structural profile of a SQL statement
    Analyze {
        /// The SQL statement
        sql: String,
    },

    /// Generate a rewrite suggestion for a slow statement
    Optimize {
        /// Identifier of the slow query this statement came from
        #[arg(long)]
        slow_query_id: i64,

        /// The SQL statement
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        sql: Option<String>,

        /// Read the SQL statement from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List suggestions awaiting review
    Pending {
        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show a suggestion
    Show {
        /// Optimization ID
        id: i64,
    },

    /// Accept a pending suggestion
    Accept {
        /// Optimization ID
        id: i64,
    },

    /// Reject a pending suggestion
    Reject {
        /// Optimization ID
        id: i64,
    },

    /// Show system status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, log_json: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let layer = fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}

fn emit<T: Serialize>(json: bool, value: &T, print: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);
    let config_arg = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => handle_init(config_arg, force, cli.json).await?,

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sqlsage", &mut std::io::stdout());
        }

        Commands::Analyze { sql } => {
            let pattern = cmd_analyze(&sql);
            emit(cli.json, &pattern, print_pattern)?;
        }

        Commands::SeedDocs { file } => {
            let (config, db) = open(config_arg).await?;
            let report = cmd_seed_docs(&config, &db, file.as_deref())
                .await
                .context("seeding knowledge base")?;
            emit(cli.json, &report, print_seed_report)?;
        }

        Commands::Search { query, limit } => {
            let (config, db) = open(config_arg).await?;
            let report = cmd_search(&config, &db, &query, limit).await?;
            emit(cli.json, &report, print_search_report)?;
        }

        Commands::Optimize {
            slow_query_id,
            sql,
            file,
        } => {
            let sql = read_sql_input(sql, file.as_deref())?;
            let (config, db) = open(config_arg).await?;
            let engine = open_engine(&config, &db)?;
            let result = cmd_optimize(&engine, slow_query_id, &sql)
                .await
                .with_context(|| format!("optimizing slow query {}", slow_query_id))?;
            emit(cli.json, &result, print_optimization)?;
        }

        Commands::Pending { limit } => {
            let (config, db) = open(config_arg).await?;
            let engine = open_engine(&config, &db)?;
            let pending = cmd_pending(&engine, limit).await?;
            emit(cli.json, &pending, |p| print_pending(p))?;
        }

        Commands::Show { id } => {
            let (config, db) = open(config_arg).await?;
            let engine = open_engine(&config, &db)?;
            let result = cmd_show(&engine, id).await?;
            emit(cli.json, &result, print_optimization)?;
        }

        Commands::Accept { id } => {
            let (config, db) = open(config_arg).await?;
            let engine = open_engine(&config, &db)?;
            let result = cmd_accept(&engine, id).await?;
            emit(cli.json, &result, |r| println!("✓ Accepted optimization #{}", r.id))?;
        }

        Commands::Reject { id } => {
            let (config, db) = open(config_arg).await?;
            let engine = open_engine(&config, &db)?;
            let result = cmd_reject(&engine, id).await?;
            emit(cli.json, &result, |r| println!("✓ Rejected optimization #{}", r.id))?;
        }

        Commands::Status => {
            let (config, db) = open(config_arg).await?;
            let status = cmd_status(&config, &db).await?;
            emit(cli.json, &status, print_status)?;
        }
    }

    Ok(())
}

/// Resolve `--config` to a config file path; a directory means its
/// `config.toml`
fn resolve_config_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => path.to_path_buf(),
        Some(dir) => dir.join("config.toml"),
        None => Config::default_config_path(),
    }
}

async fn handle_init(path: Option<&Path>, force: bool, json: bool) -> Result<()> {
    let config = cmd_init(Some(resolve_config_path(path)), force).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "config": config.paths.config_file,
                "database": config.paths.db_file,
            })
        );
        return Ok(());
    }

    println!("✓ sqlsage initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("  Database: {}", config.paths.db_file.display());
    println!("\nNext steps:");
    println!("  1. Edit the config file to choose embedding and generator backends");
    println!("  2. Load the knowledge base: sqlsage seed-docs");
    println!("  3. Suggest a rewrite: sqlsage optimize --slow-query-id 1 --sql 'SELECT ...'");

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = resolve_config_path(path);

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found: {}\nRun 'sqlsage init' first.",
            config_path.display()
        );
    }

    Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))
}

/// Load the config and open its database
async fn open(path: Option<&Path>) -> Result<(Config, MetaDb)> {
    let config = load_config(path)?;
    let db = MetaDb::connect(&config)
        .await
        .with_context(|| format!("opening database {}", config.paths.db_file.display()))?;
    Ok((config, db))
}
