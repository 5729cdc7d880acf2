// Adapter settings shared by every provider call
// Loaded from the `[providers]` config section; all fields have defaults

use serde::{Deserialize, Serialize};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const AZURE_API_VERSION: &str = "2024-02-15-preview";
pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

const OPENAI_COMPLETION_TOKEN_MODELS: &[&str] = &[
    "o1",
    "o3",
    "o4-mini",
    "gpt-5",
    "-2024-08-06",
    "-2024-11-20",
    "-2025-",
];

const AZURE_EXTRA_COMPLETION_TOKEN_MODELS: &[&str] = &["gpt-4o", "gpt-4.1", "o4"];

/// Which OpenAI-style models take `max_completion_tokens` instead of `max_tokens`
///
/// Matching is a case-insensitive substring test against the model (or
/// deployment) name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TokenLimitRules {
    patterns: Vec<String>,
}

impl TokenLimitRules {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
        }
    }

    pub fn openai_defaults() -> Self {
        Self::new(OPENAI_COMPLETION_TOKEN_MODELS.iter().copied())
    }

    /// OpenAI's table plus the names Azure deployments commonly use
    pub fn azure_defaults() -> Self {
        Self::new(
            OPENAI_COMPLETION_TOKEN_MODELS
                .iter()
                .chain(AZURE_EXTRA_COMPLETION_TOKEN_MODELS)
                .copied(),
        )
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn uses_completion_tokens(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        self.patterns.iter().any(|p| model.contains(p.as_str()))
    }

    /// Name of the token-cap field for this model
    pub fn field_for(&self, model: &str) -> &'static str {
        if self.uses_completion_tokens(model) {
            "max_completion_tokens"
        } else {
            "max_tokens"
        }
    }
}

impl From<Vec<String>> for TokenLimitRules {
    fn from(patterns: Vec<String>) -> Self {
        Self::new(patterns)
    }
}

impl From<TokenLimitRules> for Vec<String> {
    fn from(rules: TokenLimitRules) -> Self {
        rules.patterns
    }
}

/// Settings for the provider adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterSettings {
    /// Cap sent with every request
    pub max_tokens: u32,
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub azure_api_version: String,
    pub bedrock_anthropic_version: String,
    pub openai_completion_token_models: TokenLimitRules,
    pub azure_completion_token_models: TokenLimitRules,
    /// HTTP client timeout; unset means calls run to completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            openai_base_url: OPENAI_API_BASE.to_string(),
            gemini_base_url: GEMINI_API_BASE.to_string(),
            azure_api_version: AZURE_API_VERSION.to_string(),
            bedrock_anthropic_version: BEDROCK_ANTHROPIC_VERSION.to_string(),
            openai_completion_token_models: TokenLimitRules::openai_defaults(),
            azure_completion_token_models: TokenLimitRules::azure_defaults(),
            timeout_secs: None,
        }
    }
}

impl AdapterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = url.into();
        self
    }

    pub fn with_gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_base_url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}
