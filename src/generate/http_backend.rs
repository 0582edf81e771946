use super::{GenerationOptions, Generator};
use crate::backend::{BackendClient, BackendStage};
use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint
pub struct HttpGenerator {
    client: BackendClient,
    model_id: String,
}

impl HttpGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let client = BackendClient::new(
            &config.base_url,
            &config.api_key_env,
            config.timeout_secs,
            BackendStage::Generation,
        )?;
        Ok(Self::with_client(client, &config.model))
    }

    pub fn with_client(client: BackendClient, model: &str) -> Self {
        Self {
            client,
            model_id: model.to_string(),
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = options.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model_id,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: (!options.stop.is_empty()).then_some(options.stop.as_slice()),
        };

        let response: ChatResponse = self
            .client
            .post_json("chat/completions", &request)
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::Generation("Generator returned no completion text".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
