//! Default values for configuration

/// Default embedding provider
pub fn default_embedding_provider() -> String {
    "mock".to_string()
}

/// Default embedding model (text-embedding-3-small)
pub fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Default embedding dimension, matching text-embedding-3-small
pub fn default_embedding_dimension() -> usize {
    1536
}

/// Default embedding backend URL
pub fn default_embedding_base_url() -> String {
    std::env::var("SQLSAGE_EMBEDDING_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

/// Default environment variable name for the embedding API key
pub fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default generator provider
pub fn default_generator_provider() -> String {
    "mock".to_string()
}

/// Default generation model
pub fn default_generator_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default generator backend URL
pub fn default_generator_base_url() -> String {
    std::env::var("SQLSAGE_GENERATOR_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

/// Default environment variable name for the generator API key
pub fn default_generator_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default completion token budget
pub fn default_generator_max_tokens() -> u32 {
    2000
}

/// Default sampling temperature (low, rewrites should be conservative)
pub fn default_generator_temperature() -> f32 {
    0.1
}

/// Default HTTP request timeout in seconds
pub fn default_request_timeout() -> u64 {
    30
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    400
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    50
}

/// Default number of passages retrieved per prompt
pub fn default_retrieval_top_k() -> usize {
    3
}

/// Default maximum cosine distance for a passage to count as relevant
pub fn default_retrieval_max_distance() -> f32 {
    0.5
}

/// Default database flavor named in the prompt
pub fn default_database_flavor() -> String {
    "TiDB".to_string()
}

/// Default bound on each collaborator call made by the engine
pub fn default_call_timeout() -> u64 {
    60
}
