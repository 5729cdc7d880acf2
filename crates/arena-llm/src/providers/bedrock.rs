use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::config::AdapterSettings;
use crate::error::{LlmError, Result};
use crate::providers::{send_json, str_at, u32_at};
use crate::traits::{Completion, ProviderAdapter};
use crate::types::{Message, ModelConfig};

const LABEL: &str = "AWS Bedrock";

/// AWS Bedrock adapter for Anthropic-format models
///
/// Posts to the configured endpoint with the key as a raw `Authorization`
/// value. The request wraps a JSON-encoded Anthropic messages body.
#[derive(Debug, Clone)]
pub struct BedrockAdapter {
    http_client: reqwest::Client,
    anthropic_version: String,
    max_tokens: u32,
}

impl BedrockAdapter {
    pub fn new(http_client: reqwest::Client, settings: &AdapterSettings) -> Self {
        Self {
            http_client,
            anthropic_version: settings.bedrock_anthropic_version.clone(),
            max_tokens: settings.max_tokens,
        }
    }

    pub fn build_request(&self, model_id: &str, history: &[Message]) -> Result<Value> {
        let inner = serde_json::json!({
            "anthropic_version": self.anthropic_version,
            "max_tokens": self.max_tokens,
            "messages": history,
        });
        let inner = serde_json::to_string(&inner)
            .map_err(|e| LlmError::provider(format!("Failed to encode {} body: {}", LABEL, e)))?;

        Ok(serde_json::json!({
            "modelId": model_id,
            "contentType": "application/json",
            "accept": "*/*",
            "body": inner,
        }))
    }
}

/// Extract the reply from either response shape
///
/// `{"body": "<json string>"}` is decoded again and preferred; otherwise the
/// response is read as a direct `{"content": [...]}` object.
pub fn parse_response(data: &Value) -> Result<Completion> {
    let payload = match data.get("body") {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).map_err(|e| {
            LlmError::provider(format!("Failed to parse {} response body: {}", LABEL, e))
        })?,
        Some(nested @ Value::Object(_)) => nested.clone(),
        _ => data.clone(),
    };

    let token_count = u32_at(&payload, "/usage/total_tokens").or_else(|| {
        let input = u32_at(&payload, "/usage/input_tokens")?;
        let output = u32_at(&payload, "/usage/output_tokens")?;
        Some(input.saturating_add(output))
    });

    Ok(Completion::new(str_at(&payload, "/content/0/text"), token_count))
}

#[async_trait]
impl ProviderAdapter for BedrockAdapter {
    async fn invoke(&self, config: &ModelConfig, history: &[Message]) -> Result<Completion> {
        let endpoint = config.required_endpoint()?;
        let payload = self.build_request(&config.model_name, history)?;

        tracing::debug!(model = %config.model_name, turns = history.len(), "Sending Bedrock request");

        let request = self
            .http_client
            .post(endpoint)
            .header(AUTHORIZATION, &config.api_key)
            .json(&payload);

        let body = send_json(request, LABEL, "/message").await?;
        parse_response(&body)
    }
}
