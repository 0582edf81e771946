//! Knowledge-base document store
//!
//! This module owns the retrieval side of the pipeline:
//! - Chunking and embedding documents before they are persisted
//! - Replacing a document's chunks atomically when it is re-seeded
//! - Nearest-neighbour search by cosine distance over stored chunks

mod knowledge;

pub use knowledge::*;

use crate::chunk::{chunk_document, compute_text_hash};
use crate::config::{ChunkConfig, Config, RetrievalConfig};
use crate::embed::{cosine_distance, embed_in_batches, Embedder};
use crate::error::{Error, Result};
use crate::meta::{decode_embedding, ChunkDraft, Document, MetaDb};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A retrieved knowledge passage
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Title of the owning document
    pub document: String,
    pub category: String,
    pub url: Option<String>,
    pub chunk_index: usize,
    pub text: String,
    /// Cosine distance to the query, lower is closer
    pub distance: f32,
    /// `1 - distance`
    pub score: f32,
}

/// Outcome of a seeding run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedStats {
    pub documents: usize,
    pub chunks: usize,
}

/// Document store backed by SQLite and an [`Embedder`]
pub struct DocumentStore {
    db: MetaDb,
    embedder: Arc<dyn Embedder>,
    chunk: ChunkConfig,
    retrieval: RetrievalConfig,
    batch_size: usize,
}

impl DocumentStore {
    pub fn new(
        db: MetaDb,
        embedder: Arc<dyn Embedder>,
        chunk: ChunkConfig,
        retrieval: RetrievalConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            db,
            embedder,
            chunk,
            retrieval,
            batch_size,
        }
    }

    /// Build a store using the chunking, retrieval, and batching settings of `config`
    pub fn from_config(config: &Config, db: MetaDb, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(
            db,
            embedder,
            config.chunk.clone(),
            config.retrieval.clone(),
            config.embedding.batch_size,
        )
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Insert `input`, or replace the document with the same title.
    ///
    /// All embedding happens before anything is written, so a failed
    /// embedding call leaves any previous version intact. Returns the number
    /// of chunks stored.
    pub async fn add_or_update_document(&self, input: &DocumentInput) -> Result<usize> {
        if input.title.trim().is_empty() {
            return Err(Error::InvalidInput("document title must not be empty".to_string()));
        }

        let chunks = chunk_document(&input.content, &self.chunk)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_in_batches(self.embedder(), texts, self.batch_size).await?;

        let expected = self.embedder.dimension();
        if let Some(bad) = embeddings.iter().find(|v| v.len() != expected) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch for model '{}': expected {}, got {}",
                self.embedder.model_name(),
                expected,
                bad.len()
            )));
        }

        let drafts: Vec<ChunkDraft> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkDraft {
                chunk_index: chunk.index,
                chunk_hash: chunk.hash,
                chunk_text: chunk.text,
                char_start: chunk.char_start,
                char_end: chunk.char_end,
                embedding,
            })
            .collect();

        let doc = Document::new(
            input.title.clone(),
            input.content.clone(),
            input.category.clone(),
            input.url.clone(),
            compute_text_hash(&input.content),
        );
        let doc_id = self.db.replace_document(&doc, &drafts).await?;

        debug!(
            "Indexed '{}' as {} with {} chunks",
            input.title,
            doc_id,
            drafts.len()
        );
        Ok(drafts.len())
    }

    /// Add or replace every document in `inputs`, stopping at the first failure
    pub async fn seed(&self, inputs: &[DocumentInput]) -> Result<SeedStats> {
        let mut stats = SeedStats::default();
        for input in inputs {
            stats.chunks += self.add_or_update_document(input).await?;
            stats.documents += 1;
        }
        info!(
            "Seeded {} documents ({} chunks)",
            stats.documents, stats.chunks
        );
        Ok(stats)
    }

    /// Seed the curated documents shipped with sqlsage
    pub async fn seed_builtin(&self) -> Result<SeedStats> {
        self.seed(&builtin_documents()).await
    }

    /// Seed documents from a TOML knowledge file
    pub async fn seed_file(&self, path: &Path) -> Result<SeedStats> {
        let inputs = load_knowledge_file(path)?;
        info!("Loaded {} documents from {:?}", inputs.len(), path);
        self.seed(&inputs).await
    }

    /// Return up to `top_k` chunks closer than the configured distance
    /// threshold, nearest first.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned for query".to_string()))?;

        let candidates = self.db.list_searchable_chunks().await?;
        let total = candidates.len();
        let mut skipped = 0usize;
        let mut results = Vec::new();

        for candidate in candidates {
            if candidate.dimension as usize != query_vector.len() {
                skipped += 1;
                continue;
            }
            let vector = decode_embedding(&candidate.embedding)?;
            let distance = cosine_distance(&query_vector, &vector);
            if distance < self.retrieval.max_distance {
                results.push(SearchResult {
                    document: candidate.title,
                    category: candidate.category,
                    url: candidate.url,
                    chunk_index: candidate.chunk_index as usize,
                    text: candidate.chunk_text,
                    distance,
                    score: 1.0 - distance,
                });
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} chunks embedded with a different dimension than {}; re-run seed-docs",
                skipped,
                query_vector.len()
            );
        }

        results.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        results.truncate(top_k);

        debug!(
            "Search matched {} of {} chunks (max distance {})",
            results.len(),
            total,
            self.retrieval.max_distance
        );
        Ok(results)
    }
}
