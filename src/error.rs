//! Custom error types for sqlsage

use thiserror::Error;

/// Main error type for sqlsage operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Failed to retrieve optimization context: {0}")]
    Retrieval(#[source] Box<Error>),

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Not initialized: run 'sqlsage init' first")]
    NotInitialized,

    #[error("Already initialized at {0}")]
    AlreadyInitialized(String),
}

impl Error {
    /// True for lookups and status transitions that found no eligible record
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True when an embedding or generation backend failed, directly or
    /// while assembling retrieval context
    pub fn is_collaborator_failure(&self) -> bool {
        match self {
            Error::Embedding(_) | Error::Generation(_) | Error::Timeout { .. } => true,
            Error::Retrieval(inner) => inner.is_collaborator_failure(),
            _ => false,
        }
    }
}

/// Result type alias for sqlsage
pub type Result<T> = std::result::Result<T, Error>;
