use super::{reject_empty, Embedder};
use crate::backend::{BackendClient, BackendStage};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint
pub struct HttpEmbedder {
    client: BackendClient,
    model_id: String,
    dimension: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = BackendClient::new(
            &config.base_url,
            &config.api_key_env,
            config.timeout_secs,
            BackendStage::Embedding,
        )?;
        Ok(Self::with_client(client, &config.model, config.dimension))
    }

    pub fn with_client(client: BackendClient, model: &str, dimension: usize) -> Self {
        Self {
            client,
            model_id: model.to_string(),
            dimension,
        }
    }

    fn validate_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch for model '{}': expected {}, got {}",
                self.model_id,
                self.dimension,
                mismatch.len()
            )));
        }
        Ok(())
    }
}

/// Order vectors by their reported index and check one arrived per input
fn into_ordered(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(Error::Embedding(format!(
            "Embedding backend returned {} vectors for {} inputs",
            data.len(),
            expected
        )));
    }

    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
        let in_range = data
            .iter()
            .enumerate()
            .all(|(i, d)| d.index == Some(i));
        if !in_range {
            return Err(Error::Embedding(
                "Embedding backend returned duplicate or out-of-range indices".to_string(),
            ));
        }
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        reject_empty(&texts)?;

        let request = EmbeddingRequest {
            model: &self.model_id,
            input: &texts,
        };
        let response: EmbeddingResponse = self.client.post_json("embeddings", &request).await?;

        let embeddings = into_ordered(response.data, texts.len())?;
        self.validate_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
