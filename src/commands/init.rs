//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use std::path::PathBuf;
use tracing::info;

/// Write a default config and create the database schema.
///
/// `config_path` names the config file to write; the database is created
/// beside it. Without one the default `~/.sqlsage/config.toml` is used.
/// Refuses to touch an existing config unless `force` is set. The database
/// is opened either way; schema creation is idempotent and never drops
/// stored documents or rewrites.
pub async fn cmd_init(config_path: Option<PathBuf>, force: bool) -> Result<Config> {
    let mut config = Config::default();
    match config_path {
        Some(path) => config.use_config_file(&path),
        None => config.init_paths(None),
    }

    if config.paths.config_file.exists() && !force {
        return Err(Error::AlreadyInitialized(
            config.paths.config_file.display().to_string(),
        ));
    }

    info!("Initializing sqlsage at {:?}", config.paths.base_dir);
    std::fs::create_dir_all(&config.paths.base_dir)?;
    config.save()?;

    MetaDb::new(&config.paths.db_file).await?;

    Ok(config)
}
