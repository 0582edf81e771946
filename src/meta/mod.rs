//! Local storage using SQLite
//!
//! This module handles all persistent state:
//! - Documents (knowledge-base entries, unique by title)
//! - Chunks (embedded windows of documents)
//! - Rewrites (generated optimization suggestions and their review status)

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Current time as a sortable RFC 3339 timestamp
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Encode an embedding as little-endian f32 bytes
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian f32 bytes produced by [`encode_embedding`]
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::InvalidInput(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Review status of a generated rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "accepted" => Ok(ReviewStatus::Accepted),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(Error::InvalidInput(format!("Unknown review status: {}", s))),
        }
    }
}

/// A knowledge-base document
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub url: Option<String>,
    pub content_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
        url: Option<String>,
        content_hash: String,
    ) -> Self {
        let now = now_timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            category: category.into(),
            url,
            content_hash,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A stored chunk row
#[derive(Debug, Clone, FromRow)]
pub struct Chunk {
    pub id: String,
    pub doc_id: String,
    pub chunk_index: i64,
    pub chunk_hash: String,
    pub chunk_text: String,
    pub char_start: i64,
    pub char_end: i64,
    pub embedding: Vec<u8>,
    pub dimension: i64,
    pub created_at: String,
}

/// An embedded chunk waiting to be attached to its document
#[derive(Debug, Clone)]
pub struct ChunkDraft {
    pub chunk_index: usize,
    pub chunk_hash: String,
    pub chunk_text: String,
    pub char_start: usize,
    pub char_end: usize,
    pub embedding: Vec<f32>,
}

/// A chunk joined with its owning document, as scanned by similarity search
#[derive(Debug, Clone, FromRow)]
pub struct SearchableChunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub title: String,
    pub category: String,
    pub url: Option<String>,
    pub chunk_index: i64,
    pub chunk_text: String,
    pub embedding: Vec<u8>,
    pub dimension: i64,
}

/// A rewrite ready to be stored
#[derive(Debug, Clone)]
pub struct NewRewrite {
    pub slow_query_id: i64,
    pub original_sql: String,
    pub optimized_sql: String,
    pub rationale: String,
    pub expected_plan_change: String,
    pub caveats: String,
    pub confidence: f64,
    pub pattern_json: String,
    pub model: String,
    pub created_at: String,
}

/// A stored rewrite row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RewriteRecord {
    pub id: i64,
    pub slow_query_id: i64,
    pub original_sql: String,
    pub optimized_sql: String,
    pub rationale: String,
    pub expected_plan_change: String,
    pub caveats: String,
    pub confidence: f64,
    pub pattern_json: String,
    pub model: String,
    pub status: String,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

impl RewriteRecord {
    pub fn get_status(&self) -> Result<ReviewStatus> {
        self.status.parse()
    }
}

/// Metadata database handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the database named in the configuration
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Connect and create the schema if it is missing
    pub async fn new(db_path: &Path) -> Result<Self> {
        let db = Self::open(db_path).await?;
        if !db.is_initialized().await? {
            db.init_schema().await?;
        }
        Ok(db)
    }

    async fn open(db_path: &Path) -> Result<Self> {
        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='rewrites'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== Document Operations =====

    /// Upsert `doc` by title and replace all of its chunks, atomically.
    ///
    /// An existing document keeps its id and creation time. Returns the id of
    /// the stored document.
    pub async fn replace_document(&self, doc: &Document, chunks: &[ChunkDraft]) -> Result<String> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, title, content, category, url, content_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                content = excluded.content,
                category = excluded.category,
                url = excluded.url,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(&doc.category)
        .bind(&doc.url)
        .bind(&doc.content_hash)
        .bind(&doc.created_at)
        .bind(&doc.updated_at)
        .execute(&mut *tx)
        .await?;

        let doc_id: String = sqlx::query_scalar("SELECT id FROM documents WHERE title = ?")
            .bind(&doc.title)
            .fetch_one(&mut *tx)
            .await?;

        let removed = sqlx::query("DELETE FROM chunks WHERE doc_id = ?")
            .bind(&doc_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let now = now_timestamp();
        for draft in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, doc_id, chunk_index, chunk_hash, chunk_text, char_start, char_end, embedding, dimension, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&doc_id)
            .bind(draft.chunk_index as i64)
            .bind(&draft.chunk_hash)
            .bind(&draft.chunk_text)
            .bind(draft.char_start as i64)
            .bind(draft.char_end as i64)
            .bind(encode_embedding(&draft.embedding))
            .bind(draft.embedding.len() as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            "Stored document '{}' ({}): {} chunks replaced by {}",
            doc.title,
            doc_id,
            removed,
            chunks.len()
        );
        Ok(doc_id)
    }

    /// Get document by title
    pub async fn get_document_by_title(&self, title: &str) -> Result<Option<Document>> {
        let doc = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// List all documents
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let docs = sqlx::query_as::<_, Document>("SELECT * FROM documents ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(docs)
    }

    // ===== Chunk Operations =====

    /// Get chunks for a document
    pub async fn get_chunks(&self, doc_id: &str) -> Result<Vec<Chunk>> {
        let chunks = sqlx::query_as::<_, Chunk>(
            "SELECT * FROM chunks WHERE doc_id = ? ORDER BY chunk_index",
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chunks)
    }

    /// Every chunk with its document metadata, for a linear similarity scan
    pub async fn list_searchable_chunks(&self) -> Result<Vec<SearchableChunk>> {
        let chunks = sqlx::query_as::<_, SearchableChunk>(
            r#"
            SELECT c.id AS chunk_id, c.doc_id, d.title, d.category, d.url,
                   c.chunk_index, c.chunk_text, c.embedding, c.dimension
            FROM chunks c
            JOIN documents d ON c.doc_id = d.id
            ORDER BY d.title, c.chunk_index
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(chunks)
    }

    // ===== Rewrite Operations =====

    /// Store a new pending rewrite and return its id
    pub async fn insert_rewrite(&self, rewrite: &NewRewrite) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO rewrites (slow_query_id, original_sql, optimized_sql, rationale,
                                  expected_plan_change, caveats, confidence, pattern_json,
                                  model, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(rewrite.slow_query_id)
        .bind(&rewrite.original_sql)
        .bind(&rewrite.optimized_sql)
        .bind(&rewrite.rationale)
        .bind(&rewrite.expected_plan_change)
        .bind(&rewrite.caveats)
        .bind(rewrite.confidence)
        .bind(&rewrite.pattern_json)
        .bind(&rewrite.model)
        .bind(&rewrite.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get rewrite by ID
    pub async fn get_rewrite(&self, id: i64) -> Result<Option<RewriteRecord>> {
        let record = sqlx::query_as::<_, RewriteRecord>("SELECT * FROM rewrites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Rewrites with `status`, most confident first, newest first among ties
    pub async fn list_rewrites_by_status(
        &self,
        status: ReviewStatus,
        limit: usize,
    ) -> Result<Vec<RewriteRecord>> {
        let records = sqlx::query_as::<_, RewriteRecord>(
            r#"
            SELECT * FROM rewrites
            WHERE status = ?
            ORDER BY confidence DESC, created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(status.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Move a pending rewrite to `status`, stamping `reviewed_at`.
    ///
    /// Fails with `Error::NotFound` when no pending rewrite has this id.
    pub async fn review_rewrite(&self, id: i64, status: ReviewStatus) -> Result<()> {
        if status == ReviewStatus::Pending {
            return Err(Error::InvalidInput(
                "a rewrite cannot be moved back to pending".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE rewrites SET status = ?, reviewed_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "optimization {} not found or already reviewed",
                id
            )));
        }
        Ok(())
    }

    // ===== Statistics =====

    /// Get global statistics
    pub async fn get_global_stats(&self) -> Result<GlobalStats> {
        let document_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;

        let chunk_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;

        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM rewrites GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let count_for = |status: ReviewStatus| {
            by_status
                .iter()
                .find(|(s, _)| s == status.as_str())
                .map(|(_, n)| *n as usize)
                .unwrap_or(0)
        };

        Ok(GlobalStats {
            document_count: document_count as usize,
            chunk_count: chunk_count as usize,
            pending_rewrites: count_for(ReviewStatus::Pending),
            accepted_rewrites: count_for(ReviewStatus::Accepted),
            rejected_rewrites: count_for(ReviewStatus::Rejected),
        })
    }
}

/// Global statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub pending_rewrites: usize,
    pub accepted_rewrites: usize,
    pub rejected_rewrites: usize,
}
