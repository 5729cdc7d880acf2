use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Provider behind a configured model
///
/// Tags round-trip through their lowercase wire names (`openai`, `azure`,
/// `gemini`, `aws`). A tag that matches none of them is kept as `Unknown`
/// so persisted state still loads; such a model can never be saved or invoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderKind {
    OpenAI,
    Azure,
    Gemini,
    Aws,
    Unknown(String),
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAI,
        ProviderKind::Azure,
        ProviderKind::Gemini,
        ProviderKind::Aws,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenAI => "openai",
            Self::Azure => "azure",
            Self::Gemini => "gemini",
            Self::Aws => "aws",
            Self::Unknown(tag) => tag,
        }
    }

    /// Human-facing provider label
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Azure => "Azure OpenAI",
            Self::Gemini => "Google Gemini",
            Self::Aws => "AWS Bedrock",
            Self::Unknown(tag) => tag,
        }
    }

    /// Azure and Bedrock have no fixed public host
    pub fn requires_endpoint(&self) -> bool {
        matches!(self, Self::Azure | Self::Aws)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for ProviderKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "openai" => Self::OpenAI,
            "azure" => Self::Azure,
            "gemini" => Self::Gemini,
            "aws" => Self::Aws,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match ProviderKind::from(s.trim().to_lowercase()) {
            ProviderKind::Unknown(tag) => Err(ConfigError::UnknownProvider(tag)),
            kind => Ok(kind),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and connection details for one provider endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub id: String,
    pub name: String,
    pub provider: ProviderKind,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Model id for OpenAI/Gemini/Bedrock, deployment name for Azure
    pub model_name: String,
}

impl ModelConfig {
    pub fn builder(provider: ProviderKind) -> ModelConfigBuilder {
        ModelConfigBuilder::new(provider)
    }

    /// Check every required field; blank strings count as missing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let ProviderKind::Unknown(tag) = &self.provider {
            return Err(ConfigError::UnknownProvider(tag.clone()));
        }
        if is_blank(&self.id) {
            return Err(ConfigError::MissingField("id"));
        }
        if is_blank(&self.name) {
            return Err(ConfigError::MissingField("name"));
        }
        if is_blank(&self.api_key) {
            return Err(ConfigError::MissingField("apiKey"));
        }
        if is_blank(&self.model_name) {
            return Err(ConfigError::MissingField("modelName"));
        }
        if self.provider.requires_endpoint() && self.endpoint.as_deref().map_or(true, is_blank) {
            return Err(ConfigError::EndpointRequired(self.provider.clone()));
        }
        Ok(())
    }

    /// Endpoint for providers that need one, already checked to be present
    pub fn required_endpoint(&self) -> Result<&str, ConfigError> {
        self.endpoint
            .as_deref()
            .filter(|e| !is_blank(e))
            .ok_or_else(|| ConfigError::EndpointRequired(self.provider.clone()))
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Builder for ModelConfig
///
/// `build` validates and assigns a fresh `model-<uuid>` id when none is set.
#[derive(Debug, Clone)]
pub struct ModelConfigBuilder {
    provider: ProviderKind,
    id: Option<String>,
    name: Option<String>,
    api_key: Option<String>,
    endpoint: Option<String>,
    model_name: Option<String>,
}

impl ModelConfigBuilder {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            id: None,
            name: None,
            api_key: None,
            endpoint: None,
            model_name: None,
        }
    }

    /// Keep an existing id (editing a saved model)
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn build(self) -> Result<ModelConfig, ConfigError> {
        let endpoint = if self.provider.requires_endpoint() {
            self.endpoint.map(|e| e.trim().to_string())
        } else {
            None
        };

        let config = ModelConfig {
            id: self
                .id
                .unwrap_or_else(|| format!("model-{}", uuid::Uuid::new_v4())),
            name: self.name.unwrap_or_default().trim().to_string(),
            provider: self.provider,
            api_key: self.api_key.unwrap_or_default(),
            endpoint,
            model_name: self.model_name.unwrap_or_default().trim().to_string(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai() -> ModelConfigBuilder {
        ModelConfig::builder(ProviderKind::OpenAI)
            .name("GPT-4")
            .api_key("sk-test")
            .model_name("gpt-4")
    }

    #[test]
    fn test_builder_assigns_unique_ids() {
        let a = openai().build().unwrap();
        let b = openai().build().unwrap();
        assert!(a.id.starts_with("model-"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_builder_keeps_given_id() {
        let config = openai().id("model-1").build().unwrap();
        assert_eq!(config.id, "model-1");
    }

    #[test]
    fn test_missing_fields() {
        let err = ModelConfig::builder(ProviderKind::OpenAI)
            .api_key("k")
            .model_name("gpt-4")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingField("name"));

        let err = openai().api_key("   ").build().unwrap_err();
        assert_eq!(err, ConfigError::MissingField("apiKey"));

        let err = openai().model_name("").build().unwrap_err();
        assert_eq!(err, ConfigError::MissingField("modelName"));
    }

    #[test]
    fn test_endpoint_required_for_azure_and_aws() {
        for kind in [ProviderKind::Azure, ProviderKind::Aws] {
            let err = ModelConfig::builder(kind.clone())
                .name("n")
                .api_key("k")
                .model_name("m")
                .build()
                .unwrap_err();
            assert_eq!(err, ConfigError::EndpointRequired(kind));
        }
    }

    #[test]
    fn test_endpoint_dropped_when_unused() {
        let config = ModelConfig::builder(ProviderKind::Gemini)
            .name("Gemini")
            .api_key("k")
            .model_name("gemini-pro")
            .endpoint("https://ignored.example.com")
            .build()
            .unwrap();
        assert_eq!(config.endpoint, None);
    }

    #[test]
    fn test_unknown_provider_round_trips() {
        let json = r#"{"id":"m1","name":"x","provider":"mistral","apiKey":"k","modelName":"m"}"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider, ProviderKind::Unknown("mistral".to_string()));
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownProvider("mistral".to_string()))
        );

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["provider"], "mistral");
    }

    #[test]
    fn test_camel_case_wire_shape() {
        let config = ModelConfig::builder(ProviderKind::Azure)
            .id("model-7")
            .name("Azure")
            .api_key("k")
            .endpoint("https://x.openai.azure.com/")
            .model_name("gpt4dep")
            .build()
            .unwrap();

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["provider"], "azure");
        assert_eq!(value["apiKey"], "k");
        assert_eq!(value["modelName"], "gpt4dep");
        assert_eq!(value["endpoint"], "https://x.openai.azure.com/");
    }

    #[test]
    fn test_parse_provider_tag() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("bard".parse::<ProviderKind>().is_err());
    }
}
