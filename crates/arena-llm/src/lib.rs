pub mod config;
pub mod error;
pub mod providers;
pub mod registry;
pub mod traits;
pub mod types;

pub use config::{AdapterSettings, TokenLimitRules};
pub use error::{ConfigError, LlmError};
pub use providers::{AzureOpenAIAdapter, BedrockAdapter, GeminiAdapter, OpenAIAdapter};
pub use registry::AdapterRegistry;
pub use traits::{Completion, ProviderAdapter};
pub use types::{Message, ModelConfig, ModelConfigBuilder, ProviderKind, Role};
