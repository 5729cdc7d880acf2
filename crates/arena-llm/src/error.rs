use thiserror::Error;

use crate::types::ProviderKind;

/// Rejected model configuration, caught before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{} endpoint is required", .0.display_name())]
    EndpointRequired(ProviderKind),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

/// Failure of a single provider call
///
/// Every adapter reports through `Provider`, so callers never see
/// provider-specific error shapes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("{message}")]
    Provider { message: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl LlmError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}

impl From<ConfigError> for LlmError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProvider(tag) => Self::UnknownProvider(tag),
            other => Self::provider(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
