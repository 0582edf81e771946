//! Text generation
//!
//! The [`Generator`] trait turns a prompt plus [`GenerationOptions`] into a
//! completion. Implementations:
//! - [`MockGenerator`]: canned rewrites keyed on the prompt's query type
//! - [`HttpGenerator`]: OpenAI-compatible `/chat/completions`

mod http_backend;
mod mock;

pub use http_backend::*;
pub use mock::*;

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-call generation settings.
///
/// Unset fields fall back to the backend's defaults. Deserializing from a
/// loose key/value map ignores keys that are not recognized here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl GenerationOptions {
    /// Options used by the optimization pipeline
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
            top_p: config.top_p,
            stop: Vec::new(),
            system: config.system.clone(),
        }
    }

    /// Build options from an arbitrary JSON object, ignoring unknown keys
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }
}

/// Trait for text generation providers
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for `prompt`
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a generator based on configuration
pub fn create_generator(config: &GeneratorConfig) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "mock" => Ok(Box::new(MockGenerator::new())),
        "http" => Ok(Box::new(HttpGenerator::new(config)?)),
        other => Err(Error::Config(format!(
            "Unsupported generator provider '{}'; expected 'mock' or 'http'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_from_map_ignores_unknown_keys() {
        let map = json!({
            "max_tokens": 512,
            "temperature": 0.3,
            "stop": ["\n\n"],
            "frequency_penalty": 1.5,
            "vendor_specific": {"a": 1}
        });
        let serde_json::Value::Object(map) = map else {
            unreachable!()
        };

        let options = GenerationOptions::from_map(map).unwrap();
        assert_eq!(options.max_tokens, Some(512));
        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.stop, vec!["\n\n".to_string()]);
        assert_eq!(options.top_p, None);
        assert_eq!(options.system, None);
    }

    #[test]
    fn test_options_from_map_rejects_wrong_types() {
        let serde_json::Value::Object(map) = json!({"max_tokens": "lots"}) else {
            unreachable!()
        };
        assert!(matches!(
            GenerationOptions::from_map(map),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_options_from_config() {
        let config = GeneratorConfig::default();
        let options = GenerationOptions::from_config(&config);
        assert_eq!(options.max_tokens, Some(2000));
        assert_eq!(options.temperature, Some(0.1));
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let config = GeneratorConfig {
            provider: "oracle-of-delphi".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(matches!(create_generator(&config), Err(Error::Config(_))));

        let config = GeneratorConfig::default();
        assert_eq!(create_generator(&config).unwrap().model_name(), "mock-generator");
    }
}
