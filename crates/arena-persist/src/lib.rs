pub mod error;
pub mod kv;
pub mod models;
pub mod store;
pub mod workspace;

pub use error::PersistError;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, CONVERSATIONS_KEY, MODELS_KEY};
pub use models::{ChatMessage, Conversation, MessageStatus};
pub use store::{ConversationStore, PendingTurn};
pub use workspace::Workspace;
