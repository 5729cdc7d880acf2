// OpenAI chat completions adapter

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::config::{AdapterSettings, TokenLimitRules};
use crate::error::Result;
use crate::providers::{parse_chat_completion, send_json};
use crate::traits::{Completion, ProviderAdapter};
use crate::types::{Message, ModelConfig};

const LABEL: &str = "OpenAI";

/// OpenAI client (HTTP direct, no SDK)
///
/// Sends the whole history to `{base}/chat/completions` with bearer auth.
#[derive(Debug, Clone)]
pub struct OpenAIAdapter {
    http_client: reqwest::Client,
    base_url: String,
    max_tokens: u32,
    token_rules: TokenLimitRules,
}

impl OpenAIAdapter {
    pub fn new(http_client: reqwest::Client, settings: &AdapterSettings) -> Self {
        Self {
            http_client,
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            max_tokens: settings.max_tokens,
            token_rules: settings.openai_completion_token_models.clone(),
        }
    }

    /// Build chat completion request payload
    pub fn build_request(&self, model: &str, history: &[Message]) -> Value {
        let mut request = serde_json::json!({
            "model": model,
            "messages": history,
        });

        if let Some(obj) = request.as_object_mut() {
            obj.insert(
                self.token_rules.field_for(model).to_string(),
                serde_json::json!(self.max_tokens),
            );
        }

        request
    }

    pub fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
    async fn invoke(&self, config: &ModelConfig, history: &[Message]) -> Result<Completion> {
        let payload = self.build_request(&config.model_name, history);

        tracing::debug!(model = %config.model_name, turns = history.len(), "Sending OpenAI request");

        let request = self
            .http_client
            .post(self.url())
            .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
            .json(&payload);

        let body = send_json(request, LABEL, "/error/message").await?;
        Ok(parse_chat_completion(&body))
    }
}
