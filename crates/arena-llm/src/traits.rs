use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Message, ModelConfig};

/// Normalized result of one provider call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    /// Provider-reported total token usage, when it reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
}

impl Completion {
    pub fn new(content: impl Into<String>, token_count: Option<u32>) -> Self {
        Self {
            content: content.into(),
            token_count,
        }
    }
}

/// One completion call against a configured model
///
/// `history` is the full ordered context, ending with the prompt being sent.
/// Implementations make exactly one outbound request: no retries, no caching.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn invoke(&self, config: &ModelConfig, history: &[Message]) -> Result<Completion>;
}
