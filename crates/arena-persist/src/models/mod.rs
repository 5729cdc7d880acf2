mod chat_message;
mod conversation;

pub use chat_message::{ChatMessage, MessageStatus};
pub use conversation::Conversation;
