use super::{normalize_embedding, reject_empty, Embedder};
use crate::error::Result;
use async_trait::async_trait;

/// SQL vocabulary and the dimension each term nudges
const SQL_TERMS: &[&str] = &[
    "select", "from", "where", "join", "index", "order", "group", "having", "limit", "union",
    "insert", "update", "delete", "create", "alter", "optimize", "performance", "slow", "fast",
    "query", "table", "column", "primary", "foreign", "key", "aggregate", "count", "sum", "avg",
    "max", "min",
];

const TERM_BOOST: f32 = 0.5;

/// Deterministic offline embedder.
///
/// Each text maps to a pseudo-random unit vector seeded by its blake3 hash,
/// with the dimensions reserved for SQL terms boosted when the term occurs.
/// Identical texts always collide, and shared SQL vocabulary pulls vectors
/// toward each other.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut reader = blake3::Hasher::new()
            .update(text.as_bytes())
            .finalize_xof();

        let mut bytes = vec![0u8; self.dimension * 4];
        reader.fill(&mut bytes);

        let mut vector: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| {
                let raw = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                (raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect();

        let lowered = text.to_lowercase();
        for (dim, term) in SQL_TERMS.iter().enumerate() {
            if dim < self.dimension && lowered.contains(term) {
                vector[dim] += TERM_BOOST;
            }
        }

        normalize_embedding(&vector)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        reject_empty(&texts)?;
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_deterministic_unit_vectors() {
        let embedder = MockEmbedder::new(128);
        let texts = vec![
            "SELECT * FROM orders".to_string(),
            "index best practices".to_string(),
        ];

        let first = embedder.embed(texts.clone()).await.unwrap();
        let second = embedder.embed(texts).await.unwrap();
        assert_eq!(first, second);

        for vector in &first {
            assert_eq!(vector.len(), 128);
            let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn test_small_dimension_ignores_out_of_range_terms() {
        let embedder = MockEmbedder::new(4);
        let vectors = embedder
            .embed(vec!["count sum avg max min".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0].len(), 4);
    }

    #[tokio::test]
    async fn test_rejects_empty_input() {
        let embedder = MockEmbedder::new(16);
        assert!(matches!(
            embedder.embed(Vec::new()).await,
            Err(Error::InvalidInput(_))
        ));
    }
}
