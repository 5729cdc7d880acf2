// Routes each call to the adapter for the config's provider tag

use std::time::Duration;

use async_trait::async_trait;

use crate::config::AdapterSettings;
use crate::error::{LlmError, Result};
use crate::providers::{AzureOpenAIAdapter, BedrockAdapter, GeminiAdapter, OpenAIAdapter};
use crate::traits::{Completion, ProviderAdapter};
use crate::types::{Message, ModelConfig, ProviderKind};

/// One adapter per provider, sharing a single HTTP client
///
/// Adding a provider means a new `ProviderKind` variant and a new field here;
/// callers only ever see `ProviderAdapter`.
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    openai: OpenAIAdapter,
    azure: AzureOpenAIAdapter,
    gemini: GeminiAdapter,
    bedrock: BedrockAdapter,
}

impl AdapterRegistry {
    pub fn new(settings: &AdapterSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder
            .build()
            .map_err(|e| LlmError::provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(http_client, settings))
    }

    pub fn with_client(http_client: reqwest::Client, settings: &AdapterSettings) -> Self {
        Self {
            openai: OpenAIAdapter::new(http_client.clone(), settings),
            azure: AzureOpenAIAdapter::new(http_client.clone(), settings),
            gemini: GeminiAdapter::new(http_client.clone(), settings),
            bedrock: BedrockAdapter::new(http_client, settings),
        }
    }

    pub fn adapter_for(&self, kind: &ProviderKind) -> Result<&dyn ProviderAdapter> {
        let adapter: &dyn ProviderAdapter = match kind {
            ProviderKind::OpenAI => &self.openai,
            ProviderKind::Azure => &self.azure,
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Aws => &self.bedrock,
            ProviderKind::Unknown(tag) => return Err(LlmError::UnknownProvider(tag.clone())),
        };
        Ok(adapter)
    }
}

#[async_trait]
impl ProviderAdapter for AdapterRegistry {
    async fn invoke(&self, config: &ModelConfig, history: &[Message]) -> Result<Completion> {
        let adapter = self.adapter_for(&config.provider)?;
        adapter.invoke(config, history).await
    }
}
