//! Configuration management for sqlsage
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Every backend receives its section explicitly; nothing reads global state.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Providers understood by the backend factories
pub const SUPPORTED_PROVIDERS: &[&str] = &["mock", "http"];

/// Upper bound on knowledge passages pulled into one prompt
pub const MAX_PROMPT_PASSAGES: usize = 3;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Embedding backend configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Text generation backend configuration
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Knowledge-base retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Prompt rendering configuration
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Pipeline configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend kind: "mock" or "http"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

/// Generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Backend kind: "mock" or "http"
    #[serde(default = "default_generator_provider")]
    pub provider: String,

    /// Model name/identifier
    #[serde(default = "default_generator_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_generator_api_key_env")]
    pub api_key_env: String,

    /// Maximum tokens in a completion
    #[serde(default = "default_generator_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_generator_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default)]
    pub top_p: Option<f32>,

    /// Optional system message sent ahead of the prompt
    #[serde(default)]
    pub system: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_chars")]
    pub max_chars: usize,

    /// Overlap characters between chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap_chars: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages pulled into each prompt
    #[serde(default = "default_retrieval_top_k")]
    pub top_k: usize,

    /// Chunks at or beyond this cosine distance are never returned
    #[serde(default = "default_retrieval_max_distance")]
    pub max_distance: f32,
}

/// Prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Database product the model is asked to specialize in
    #[serde(default = "default_database_flavor")]
    pub database_flavor: String,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound for retrieval and for generation, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl EngineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for sqlsage data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            generator: GeneratorConfig::default(),
            chunk: ChunkConfig::default(),
            retrieval: RetrievalConfig::default(),
            prompt: PromptConfig::default(),
            engine: EngineConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            base_url: default_embedding_base_url(),
            api_key_env: default_embedding_api_key_env(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_generator_provider(),
            model: default_generator_model(),
            base_url: default_generator_base_url(),
            api_key_env: default_generator_api_key_env(),
            max_tokens: default_generator_max_tokens(),
            temperature: default_generator_temperature(),
            top_p: None,
            system: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
            overlap_chars: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_retrieval_top_k(),
            max_distance: default_retrieval_max_distance(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            database_flavor: default_database_flavor(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout(),
        }
    }
}

impl Config {
    /// Get the default base directory for sqlsage (~/.sqlsage)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sqlsage")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("sqlsage.db"),
            base_dir: base,
        };
    }

    /// Point paths at an explicit config file; the database lives beside it
    pub fn use_config_file(&mut self, config_path: &Path) {
        let base = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        self.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("sqlsage.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.use_config_file(config_path);

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    /// when no config file exists yet
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check if sqlsage is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.max_chars == 0 {
            return Err(Error::Config("chunk.max_chars must be positive".to_string()));
        }

        if self.chunk.overlap_chars >= self.chunk.max_chars {
            return Err(Error::Config(
                "chunk.overlap_chars must be < chunk.max_chars".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        for (section, provider) in [
            ("embedding", &self.embedding.provider),
            ("generator", &self.generator.provider),
        ] {
            if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
                return Err(Error::Config(format!(
                    "{}.provider '{}' is not supported (expected one of: {})",
                    section,
                    provider,
                    SUPPORTED_PROVIDERS.join(", ")
                )));
            }
        }

        if self.retrieval.top_k == 0 || self.retrieval.top_k > MAX_PROMPT_PASSAGES {
            return Err(Error::Config(format!(
                "retrieval.top_k must be between 1 and {}",
                MAX_PROMPT_PASSAGES
            )));
        }

        if self.retrieval.max_distance <= 0.0 || self.retrieval.max_distance > 2.0 {
            return Err(Error::Config(
                "retrieval.max_distance must be in (0.0, 2.0]".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(Error::Config(
                "generator.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if let Some(top_p) = self.generator.top_p {
            if top_p <= 0.0 || top_p > 1.0 {
                return Err(Error::Config(
                    "generator.top_p must be in (0.0, 1.0]".to_string(),
                ));
            }
        }

        if self.engine.call_timeout_secs == 0 {
            return Err(Error::Config(
                "engine.call_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
