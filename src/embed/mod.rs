//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for different embedding backends
//! - A deterministic mock backend and an OpenAI-compatible HTTP backend
//! - Batch processing and vector math used by similarity search

mod http_backend;
mod mock;

pub use http_backend::*;
pub use mock::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Scale `vector` to unit length; zero vectors are returned unchanged
pub fn normalize_embedding(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

/// Cosine distance in [0, 2]; 0 means identical direction.
///
/// A zero vector has no direction and is treated as orthogonal to everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    1.0 - similarity
}

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; one vector per input, in input order.
    /// Fails with `Error::InvalidInput` when `texts` is empty.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

pub(crate) fn reject_empty(texts: &[String]) -> Result<()> {
    if texts.is_empty() {
        return Err(Error::InvalidInput(
            "cannot embed an empty list of texts".to_string(),
        ));
    }
    Ok(())
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "mock" => Ok(Box::new(MockEmbedder::new(config.dimension))),
        "http" => Ok(Box::new(HttpEmbedder::new(config)?)),
        other => Err(Error::Config(format!(
            "Unsupported embedding provider '{}'; expected 'mock' or 'http'",
            other
        ))),
    }
}

/// Helper to embed in batches
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    reject_empty(&texts)?;
    let batch_size = batch_size.max(1);
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let expected = batch_texts.len();
        let embeddings = embedder.embed(batch_texts).await?;
        if embeddings.len() != expected {
            return Err(Error::Embedding(format!(
                "Embedder returned {} vectors for {} inputs",
                embeddings.len(),
                expected
            )));
        }
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_splitting() {
        let texts: Vec<String> = (0..10).map(|i| format!("text {}", i)).collect();
        let chunks: Vec<_> = texts.chunks(3).collect();

        assert_eq!(chunks.len(), 4); // 3 + 3 + 3 + 1
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[3].len(), 1);
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 3.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_normalize_embedding() {
        let unit = normalize_embedding(&[3.0, 4.0]);
        assert!((unit[0] - 0.6).abs() < 1e-6);
        assert!((unit[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize_embedding(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_factory_selects_provider() {
        let mut config = EmbeddingConfig {
            dimension: 64,
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 64);
        assert_eq!(embedder.model_name(), "mock-embedder");

        config.provider = "carrier-pigeon".to_string();
        assert!(matches!(create_embedder(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_embed_in_batches_preserves_order() {
        let embedder = MockEmbedder::new(32);
        let texts: Vec<String> = (0..7).map(|i| format!("SELECT {} FROM t", i)).collect();

        let batched = embed_in_batches(&embedder, texts.clone(), 3).await.unwrap();
        let direct = embedder.embed(texts).await.unwrap();
        assert_eq!(batched, direct);
    }

    #[tokio::test]
    async fn test_embed_in_batches_rejects_empty() {
        let embedder = MockEmbedder::new(8);
        let result = embed_in_batches(&embedder, Vec::new(), 4).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
