pub mod message;
pub mod model;

pub use message::{Message, Role};
pub use model::{ModelConfig, ModelConfigBuilder, ProviderKind};
