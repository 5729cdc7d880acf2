pub mod builder;
pub mod dispatcher;
pub mod report;

pub use builder::DispatcherBuilder;
pub use dispatcher::Dispatcher;
pub use report::{DispatchReport, ModelOutcome};

// Re-export the types callers need to drive a dispatcher
pub use arena_llm::{ModelConfig, ProviderAdapter, ProviderKind};
pub use arena_persist::{ChatMessage, KeyValueStore, MessageStatus, Workspace};
