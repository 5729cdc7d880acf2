use async_trait::async_trait;
use serde_json::Value;

use crate::config::AdapterSettings;
use crate::error::Result;
use crate::providers::{send_json, str_at, u32_at};
use crate::traits::{Completion, ProviderAdapter};
use crate::types::{Message, ModelConfig, Role};

const LABEL: &str = "Gemini";

/// Google Gemini `generateContent` adapter
///
/// The key travels as the `key` query parameter.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    http_client: reqwest::Client,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(http_client: reqwest::Client, settings: &AdapterSettings) -> Self {
        Self {
            http_client,
            base_url: settings.gemini_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    pub fn build_request(&self, history: &[Message]) -> Value {
        let contents: Vec<Value> = history
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": gemini_role(msg.role),
                    "parts": [{ "text": msg.content }],
                })
            })
            .collect();

        serde_json::json!({ "contents": contents })
    }
}

/// Gemini has no `assistant` role; replies are `model` turns
fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn invoke(&self, config: &ModelConfig, history: &[Message]) -> Result<Completion> {
        let payload = self.build_request(history);

        tracing::debug!(model = %config.model_name, turns = history.len(), "Sending Gemini request");

        let request = self
            .http_client
            .post(self.url(&config.model_name))
            .query(&[("key", config.api_key.as_str())])
            .json(&payload);

        let body = send_json(request, LABEL, "/error/message").await?;
        Ok(Completion::new(
            str_at(&body, "/candidates/0/content/parts/0/text"),
            u32_at(&body, "/usageMetadata/totalTokenCount"),
        ))
    }
}
