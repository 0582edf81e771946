//! Thin client for OpenAI-compatible HTTP APIs
//!
//! Shared by the HTTP embedder and the HTTP generator. Each client is tagged
//! with the stage it serves so transport and decoding failures surface as
//! `Error::Embedding` or `Error::Generation` respectively.

use crate::error::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Which collaborator a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStage {
    Embedding,
    Generation,
}

impl BackendStage {
    fn error(self, message: String) -> Error {
        match self {
            BackendStage::Embedding => Error::Embedding(message),
            BackendStage::Generation => Error::Generation(message),
        }
    }
}

pub struct BackendClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    stage: BackendStage,
}

impl BackendClient {
    /// Build a client for `base_url`, reading the API key from the
    /// environment variable `api_key_env` if it is set
    pub fn new(
        base_url: &str,
        api_key_env: &str,
        timeout_secs: u64,
        stage: BackendStage,
    ) -> Result<Self> {
        let api_key = if api_key_env.is_empty() {
            None
        } else {
            std::env::var(api_key_env).ok().filter(|key| !key.is_empty())
        };
        Self::with_api_key(base_url, api_key, timeout_secs, stage)
    }

    pub fn with_api_key(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
        stage: BackendStage,
    ) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            stage,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid backend URL: {}", e)))
    }

    /// POST `body` as JSON to `path` and decode the JSON response
    pub async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let mut request = self.client.post(url.clone()).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.stage.error(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(self.stage.error(format!(
                "{} returned {}: {}",
                url,
                status,
                detail.trim()
            )));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| self.stage.error(format!("invalid response from {}: {}", url, e)))
    }
}
