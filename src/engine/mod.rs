//! Optimization pipeline and review workflow
//!
//! `optimize_query` runs analyze → prompt → generate → parse → score and
//! persists the outcome as a pending rewrite. Reviewers then move each
//! rewrite to accepted or rejected exactly once.

mod confidence;
mod response;

pub use confidence::confidence_score;
pub use response::{parse_response, ParsedResponse};

use crate::analyze::{QueryAnalyzer, QueryPattern};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generate::{GenerationOptions, Generator};
use crate::meta::{now_timestamp, MetaDb, NewRewrite, ReviewStatus, RewriteRecord};
use crate::prompt::PromptBuilder;
use crate::store::DocumentStore;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A stored rewrite with its decoded query profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub id: i64,
    pub slow_query_id: i64,
    pub original_sql: String,
    pub optimized_sql: String,
    pub pattern: QueryPattern,
    pub rationale: String,
    pub expected_plan_change: String,
    pub caveats: String,
    pub confidence: f64,
    pub model: String,
    pub status: ReviewStatus,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

impl TryFrom<RewriteRecord> for OptimizationResult {
    type Error = Error;

    fn try_from(record: RewriteRecord) -> Result<Self> {
        let status = record.get_status()?;
        let pattern: QueryPattern = serde_json::from_str(&record.pattern_json)?;
        Ok(Self {
            id: record.id,
            slow_query_id: record.slow_query_id,
            original_sql: record.original_sql,
            optimized_sql: record.optimized_sql,
            pattern,
            rationale: record.rationale,
            expected_plan_change: record.expected_plan_change,
            caveats: record.caveats,
            confidence: record.confidence,
            model: record.model,
            status,
            created_at: record.created_at,
            reviewed_at: record.reviewed_at,
        })
    }
}

/// Runs the rewrite pipeline and the review state machine
pub struct OptimizationEngine {
    db: MetaDb,
    analyzer: QueryAnalyzer,
    prompts: PromptBuilder,
    generator: Arc<dyn Generator>,
    options: GenerationOptions,
    call_timeout: Duration,
}

impl OptimizationEngine {
    pub fn new(
        db: MetaDb,
        prompts: PromptBuilder,
        generator: Arc<dyn Generator>,
        options: GenerationOptions,
        call_timeout: Duration,
    ) -> Self {
        Self {
            db,
            analyzer: QueryAnalyzer::new(),
            prompts,
            generator,
            options,
            call_timeout,
        }
    }

    /// Wire an engine from configuration
    pub fn from_config(
        config: &Config,
        db: MetaDb,
        store: Arc<DocumentStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let prompts = PromptBuilder::new(
            store,
            config.retrieval.top_k,
            config.prompt.database_flavor.clone(),
        );
        Self::new(
            db,
            prompts,
            generator,
            GenerationOptions::from_config(&config.generator),
            config.engine.call_timeout(),
        )
    }

    async fn bounded<T>(&self, stage: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                stage,
                secs: self.call_timeout.as_secs(),
            }),
        }
    }

    /// Generate, score, and store a rewrite suggestion for `sql`.
    ///
    /// Nothing is persisted unless every stage succeeds.
    pub async fn optimize_query(&self, slow_query_id: i64, sql: &str) -> Result<OptimizationResult> {
        let pattern = self.analyzer.analyze(sql);
        debug!(
            slow_query_id,
            query_type = %pattern.query_type,
            complexity = %pattern.complexity,
            "Analyzed slow query"
        );

        let prompt = self
            .bounded("retrieval", self.prompts.build(sql, &pattern))
            .await
            .map_err(|e| match e {
                Error::Retrieval(_) => e,
                other => Error::Retrieval(Box::new(other)),
            })?;

        let raw = self
            .bounded("generation", self.generator.complete(&prompt, &self.options))
            .await
            .inspect_err(|e| warn!(slow_query_id, "Generation failed: {}", e))?;

        let parsed = parse_response(&raw).inspect_err(|_| {
            debug!(slow_query_id, "Unparseable completion:\n{}", raw);
        })?;
        let confidence = confidence_score(&pattern, &parsed);

        let rewrite = NewRewrite {
            slow_query_id,
            original_sql: sql.to_string(),
            optimized_sql: parsed.proposed_sql,
            rationale: parsed.rationale,
            expected_plan_change: parsed.expected_plan_change,
            caveats: parsed.caveats,
            confidence,
            pattern_json: serde_json::to_string(&pattern)?,
            model: self.generator.model_name().to_string(),
            created_at: now_timestamp(),
        };
        let id = self.db.insert_rewrite(&rewrite).await?;

        info!(
            slow_query_id,
            id,
            confidence,
            "Stored pending optimization"
        );

        Ok(OptimizationResult {
            id,
            slow_query_id,
            original_sql: rewrite.original_sql,
            optimized_sql: rewrite.optimized_sql,
            pattern,
            rationale: rewrite.rationale,
            expected_plan_change: rewrite.expected_plan_change,
            caveats: rewrite.caveats,
            confidence,
            model: rewrite.model,
            status: ReviewStatus::Pending,
            created_at: rewrite.created_at,
            reviewed_at: None,
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<OptimizationResult> {
        self.db
            .get_rewrite(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("optimization {} not found", id)))?
            .try_into()
    }

    /// Pending rewrites, most confident first, newest first among ties
    pub async fn list_pending(&self, limit: usize) -> Result<Vec<OptimizationResult>> {
        self.db
            .list_rewrites_by_status(ReviewStatus::Pending, limit)
            .await?
            .into_iter()
            .map(OptimizationResult::try_from)
            .collect()
    }

    pub async fn accept(&self, id: i64) -> Result<()> {
        self.db.review_rewrite(id, ReviewStatus::Accepted).await?;
        info!(id, "Accepted optimization");
        Ok(())
    }

    pub async fn reject(&self, id: i64) -> Result<()> {
        self.db.review_rewrite(id, ReviewStatus::Rejected).await?;
        info!(id, "Rejected optimization");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::QueryType;
    use crate::embed::{Embedder, MockEmbedder};
    use crate::generate::MockGenerator;
    use crate::store::tests::{store_with, TopicEmbedder};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replies with a fixed completion and records every prompt it saw
    struct ScriptedGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
        options: Mutex<Vec<GenerationOptions>>,
    }

    impl ScriptedGenerator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
                options: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.options.lock().unwrap().push(options.clone());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn complete(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
            Err(Error::Generation("503 Service Unavailable".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn complete(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Err(Error::Embedding("connection refused".to_string()))
        }
        fn dimension(&self) -> usize {
            8
        }
        fn model_name(&self) -> &str {
            "down"
        }
    }

    const JOIN_SQL: &str =
        "SELECT * FROM customers c JOIN orders o ON c.id=o.customer_id WHERE c.city='Paris'";

    async fn engine_with(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        timeout: Duration,
    ) -> (OptimizationEngine, MetaDb, TempDir) {
        let (store, db, tmp) = store_with(embedder, 400).await;
        store.seed_builtin().await.ok();
        let prompts = PromptBuilder::new(Arc::new(store), 3, "TiDB");
        let options = GenerationOptions {
            max_tokens: Some(2000),
            temperature: Some(0.1),
            ..GenerationOptions::default()
        };
        let engine = OptimizationEngine::new(db.clone(), prompts, generator, options, timeout);
        (engine, db, tmp)
    }

    async fn mock_engine() -> (OptimizationEngine, MetaDb, TempDir) {
        engine_with(
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::new()),
            Duration::from_secs(10),
        )
        .await
    }

    #[tokio::test]
    async fn test_optimize_query_persists_pending_result() {
        let (engine, _db, _tmp) = mock_engine().await;

        let result = engine.optimize_query(42, JOIN_SQL).await.unwrap();
        assert_eq!(result.slow_query_id, 42);
        assert_eq!(result.status, ReviewStatus::Pending);
        assert_eq!(result.pattern.query_type, QueryType::SimpleJoin);
        assert!(result.optimized_sql.contains("INNER JOIN"));
        assert!(result.rationale.starts_with("Added LIMIT"));
        assert!(!result.rationale.contains('•'));
        assert!(!result.caveats.is_empty());
        assert!((0.1..=1.0).contains(&result.confidence));
        assert_eq!(result.model, "mock-generator");
        assert!(result.reviewed_at.is_none());

        let stored = engine.get_by_id(result.id).await.unwrap();
        assert_eq!(stored.pattern, result.pattern);
        assert_eq!(stored.optimized_sql, result.optimized_sql);
        assert_eq!(stored.confidence, result.confidence);
    }

    #[tokio::test]
    async fn test_prompt_and_options_reach_generator() {
        let generator = Arc::new(ScriptedGenerator::new(
            "PROPOSED_SQL:\n```sql\nSELECT 1\n```\n",
        ));
        let (engine, _db, _tmp) = engine_with(
            Arc::new(TopicEmbedder),
            generator.clone(),
            Duration::from_secs(10),
        )
        .await;

        engine.optimize_query(1, JOIN_SQL).await.unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Query Type: simple-join"));
        assert!(prompts[0].contains("RELEVANT TIDB OPTIMIZATION KNOWLEDGE"));
        let options = generator.options.lock().unwrap();
        assert_eq!(options[0].max_tokens, Some(2000));
        assert_eq!(options[0].temperature, Some(0.1));
    }

    #[tokio::test]
    async fn test_parse_failure_persists_nothing() {
        let generator = Arc::new(ScriptedGenerator::new("I would add an index on city."));
        let (engine, db, _tmp) = engine_with(
            Arc::new(MockEmbedder::new(64)),
            generator,
            Duration::from_secs(10),
        )
        .await;

        let err = engine.optimize_query(7, JOIN_SQL).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(db.get_global_stats().await.unwrap().pending_rewrites, 0);
        assert!(engine.list_pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_failures() {
        let (engine, db, _tmp) = engine_with(
            Arc::new(MockEmbedder::new(64)),
            Arc::new(FailingGenerator),
            Duration::from_secs(10),
        )
        .await;
        let err = engine.optimize_query(1, JOIN_SQL).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));

        let (down, _db2, _tmp2) = engine_with(
            Arc::new(DownEmbedder),
            Arc::new(MockGenerator::new()),
            Duration::from_secs(10),
        )
        .await;
        let err = down.optimize_query(1, JOIN_SQL).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
        assert!(err.is_collaborator_failure());

        assert_eq!(db.get_global_stats().await.unwrap().pending_rewrites, 0);
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let (engine, db, _tmp) = engine_with(
            Arc::new(MockEmbedder::new(64)),
            Arc::new(SlowGenerator),
            Duration::from_millis(300),
        )
        .await;

        let err = engine.optimize_query(1, JOIN_SQL).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { stage: "generation", .. }));
        assert_eq!(db.get_global_stats().await.unwrap().pending_rewrites, 0);
    }

    #[tokio::test]
    async fn test_accept_twice_is_not_found() {
        let (engine, _db, _tmp) = mock_engine().await;
        let result = engine.optimize_query(3, JOIN_SQL).await.unwrap();

        engine.accept(result.id).await.unwrap();
        let accepted = engine.get_by_id(result.id).await.unwrap();
        assert_eq!(accepted.status, ReviewStatus::Accepted);
        let reviewed_at = accepted.reviewed_at.clone().unwrap();

        let err = engine.accept(result.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("already reviewed"));
        assert!(engine.reject(result.id).await.unwrap_err().is_not_found());

        let again = engine.get_by_id(result.id).await.unwrap();
        assert_eq!(again.status, ReviewStatus::Accepted);
        assert_eq!(again.reviewed_at, Some(reviewed_at));
    }

    #[tokio::test]
    async fn test_reject_and_missing_ids() {
        let (engine, _db, _tmp) = mock_engine().await;
        let result = engine.optimize_query(5, "SELECT SLEEP(5)").await.unwrap();

        engine.reject(result.id).await.unwrap();
        assert_eq!(
            engine.get_by_id(result.id).await.unwrap().status,
            ReviewStatus::Rejected
        );

        assert!(engine.get_by_id(9999).await.unwrap_err().is_not_found());
        assert!(engine.accept(9999).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_pending_orders_by_confidence() {
        let (engine, _db, _tmp) = mock_engine().await;

        let complex = engine
            .optimize_query(
                1,
                "SELECT a.x FROM a JOIN b ON a.id=b.id JOIN c ON b.id=c.id JOIN d ON c.id=d.id \
                 JOIN e ON d.id=e.id WHERE a.y IN (SELECT y FROM f) GROUP BY a.x HAVING COUNT(*) > 1",
            )
            .await
            .unwrap();
        let simple = engine.optimize_query(2, JOIN_SQL).await.unwrap();
        let reviewed = engine.optimize_query(3, "SELECT SLEEP(1)").await.unwrap();
        engine.accept(reviewed.id).await.unwrap();

        assert!(simple.confidence > complex.confidence);

        let pending = engine.list_pending(10).await.unwrap();
        let ids: Vec<i64> = pending.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![simple.id, complex.id]);
        assert!(pending.iter().all(|r| r.status == ReviewStatus::Pending));

        assert_eq!(engine.list_pending(1).await.unwrap().len(), 1);
        assert!(engine.list_pending(0).await.unwrap().is_empty());
    }
}
