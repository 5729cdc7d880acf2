// Azure OpenAI-specific adapter

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{AdapterSettings, TokenLimitRules};
use crate::error::Result;
use crate::providers::{parse_chat_completion, send_json};
use crate::traits::{Completion, ProviderAdapter};
use crate::types::{Message, ModelConfig};

const LABEL: &str = "Azure OpenAI";

/// Azure OpenAI adapter
///
/// Azure uses a different endpoint structure and authentication method than OpenAI:
/// - URL: {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...
/// - Auth header: api-key instead of Authorization: Bearer
/// - Deployment name comes from the model config's `model_name`
/// - No `model` field in the body
#[derive(Debug, Clone)]
pub struct AzureOpenAIAdapter {
    http_client: reqwest::Client,
    api_version: String,
    max_tokens: u32,
    token_rules: TokenLimitRules,
}

impl AzureOpenAIAdapter {
    pub fn new(http_client: reqwest::Client, settings: &AdapterSettings) -> Self {
        Self {
            http_client,
            api_version: settings.azure_api_version.clone(),
            max_tokens: settings.max_tokens,
            token_rules: settings.azure_completion_token_models.clone(),
        }
    }

    pub fn build_request(&self, deployment: &str, history: &[Message]) -> Value {
        let mut request = serde_json::json!({
            "messages": history,
        });

        if let Some(obj) = request.as_object_mut() {
            obj.insert(
                self.token_rules.field_for(deployment).to_string(),
                serde_json::json!(self.max_tokens),
            );
        }

        request
    }

    pub fn url(&self, endpoint: &str, deployment: &str) -> String {
        deployment_url(endpoint, deployment, &self.api_version)
    }
}

/// Build the chat completions URL for a deployment
///
/// A single trailing slash on the endpoint is dropped.
pub fn deployment_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    let endpoint = endpoint.strip_suffix('/').unwrap_or(endpoint);
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint, deployment, api_version
    )
}

#[async_trait]
impl ProviderAdapter for AzureOpenAIAdapter {
    async fn invoke(&self, config: &ModelConfig, history: &[Message]) -> Result<Completion> {
        let endpoint = config.required_endpoint()?;
        let url = self.url(endpoint, &config.model_name);
        let payload = self.build_request(&config.model_name, history);

        tracing::debug!(deployment = %config.model_name, turns = history.len(), "Sending Azure OpenAI request");

        let request = self
            .http_client
            .post(url)
            .header("api-key", &config.api_key)
            .json(&payload);

        let body = send_json(request, LABEL, "/error/message").await?;
        Ok(parse_chat_completion(&body))
    }
}
