// SPDX-License-Identifier: MIT

//! Model module - defines LLM model trait and implementations
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [openai] - OpenAI's ChatGPT API (and compatible endpoints)

pub mod anthropic;
pub mod openai;

use crate::adk::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// JSON schema the reply must follow, when the provider supports it
    pub response_schema: Option<serde_json::Value>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Thinking/reasoning content from thinking models
    Thinking(String),
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text parts, thinking excluded
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect()
    }
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Provider label used in logs and errors
    fn provider(&self) -> &str;

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError>;
}

/// Pick a provider for `model_name`: explicit value, then `MODEL_PROVIDER`,
/// then a guess from the model name prefix.
pub fn resolve_provider(explicit: Option<&str>, model_name: &str) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var("MODEL_PROVIDER").ok())
        .unwrap_or_else(|| {
            if model_name.starts_with("claude") {
                "anthropic".to_string()
            } else {
                "openai".to_string()
            }
        })
}

/// Build a model client for a provider name
pub fn create_model(provider: &str, model_name: &str) -> Result<Arc<dyn Model>, ModelError> {
    log::info!("Using provider: {} with model: {}", provider, model_name);
    match provider.to_ascii_lowercase().as_str() {
        "openai" => Ok(Arc::new(openai::OpenAIModel::new(model_name.to_string())?)),
        "anthropic" => Ok(Arc::new(anthropic::AnthropicModel::new(
            model_name.to_string(),
        )?)),
        other => Err(ModelError::UnsupportedProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_text_skips_thinking() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![
                Part::Thinking("let me see".to_string()),
                Part::Text("{\"score\":".to_string()),
                Part::Text(" 3}".to_string()),
            ],
        };
        assert_eq!(content.text(), "{\"score\": 3}");
    }

    #[test]
    fn test_resolve_provider_explicit_wins() {
        assert_eq!(resolve_provider(Some("anthropic"), "gpt-4o"), "anthropic");
    }

    #[test]
    fn test_create_model_rejects_unknown_provider() {
        let err = create_model("palm", "x").err().unwrap();
        assert!(matches!(err, ModelError::UnsupportedProvider(p) if p == "palm"));
    }
}
