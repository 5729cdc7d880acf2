use arena_llm::{Message, Role};
use serde::{Deserialize, Serialize};

use crate::error::{PersistError, Result};
use crate::models::{ChatMessage, Conversation};

/// One independent conversation per model
///
/// Conversations only come into existence through `create_for`; every other
/// operation on an unknown model id is a no-op or an error, never an implicit
/// create. Within a conversation, order is exactly the order of `append` and
/// `replace` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
}

/// A reserved assistant slot awaiting its terminal result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub model_id: String,
    pub placeholder: ChatMessage,
    /// Success-only history plus the new prompt as the final user turn
    pub context: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conversations(conversations: Vec<Conversation>) -> Self {
        Self { conversations }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, model_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.model_id == model_id)
    }

    fn get_mut(&mut self, model_id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.model_id == model_id)
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.get(model_id).is_some()
    }

    /// Establish an empty conversation; returns false if one already exists
    pub fn create_for(&mut self, model_id: &str) -> bool {
        if self.contains(model_id) {
            return false;
        }
        self.conversations.push(Conversation::new(model_id));
        true
    }

    /// Drop the conversation entirely; returns false if there was none
    pub fn remove_for(&mut self, model_id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.model_id != model_id);
        self.conversations.len() != before
    }

    /// Add messages to the tail of a model's sequence
    ///
    /// Timestamps are raised to the previous tail's timestamp if needed so they
    /// never decrease within a conversation.
    pub fn append(&mut self, model_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        let conversation = self
            .get_mut(model_id)
            .ok_or_else(|| PersistError::ConversationNotFound(model_id.to_string()))?;

        let mut floor = conversation.messages.last().map_or(i64::MIN, |m| m.timestamp);
        for mut message in messages {
            message.timestamp = message.timestamp.max(floor);
            floor = message.timestamp;
            conversation.messages.push(message);
        }
        Ok(())
    }

    /// Swap the message with `message_id` in place
    ///
    /// Returns false when the conversation or the message is gone (for example
    /// after a clear), in which case nothing changes.
    pub fn replace(&mut self, model_id: &str, message_id: &str, message: ChatMessage) -> bool {
        let Some(conversation) = self.get_mut(model_id) else {
            return false;
        };
        match conversation.messages.iter_mut().find(|m| m.id == message_id) {
            Some(slot) => {
                *slot = message;
                true
            }
            None => false,
        }
    }

    /// Full ordered sequence for display
    pub fn all_messages(&self, model_id: &str) -> &[ChatMessage] {
        self.get(model_id)
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    /// User turns plus successful assistant turns, in order, as provider context
    pub fn success_history(&self, model_id: &str) -> Vec<Message> {
        self.all_messages(model_id)
            .iter()
            .filter(|m| m.is_context())
            .map(ChatMessage::to_message)
            .collect()
    }

    /// Content of the most recent user turn, the prompt a retry resends
    pub fn last_user_prompt(&self, model_id: &str) -> Option<&str> {
        self.all_messages(model_id)
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub fn clear(&mut self, model_id: &str) -> bool {
        match self.get_mut(model_id) {
            Some(conversation) => {
                conversation.messages.clear();
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) {
        for conversation in &mut self.conversations {
            conversation.messages.clear();
        }
    }

    /// First phase of a turn: snapshot the context, then append the user
    /// message and a loading placeholder together
    pub fn begin_turn(&mut self, model_id: &str, prompt: &str) -> Result<PendingTurn> {
        if !self.contains(model_id) {
            return Err(PersistError::ConversationNotFound(model_id.to_string()));
        }

        let mut context = self.success_history(model_id);
        context.push(Message::user(prompt));

        let placeholder = ChatMessage::placeholder(model_id);
        self.append(
            model_id,
            vec![ChatMessage::user(prompt), placeholder.clone()],
        )?;

        Ok(PendingTurn {
            model_id: model_id.to_string(),
            placeholder,
            context,
        })
    }

    /// Second phase: put the terminal message in the placeholder's slot
    pub fn finish_turn(&mut self, turn: &PendingTurn, message: ChatMessage) -> bool {
        self.replace(&turn.model_id, &turn.placeholder.id, message)
    }

    /// Mark every leftover placeholder as failed; returns how many were found
    pub fn fail_stale_placeholders(&mut self, error: &str) -> usize {
        let mut count = 0;
        for conversation in &mut self.conversations {
            for message in conversation.messages.iter_mut().filter(|m| m.is_loading()) {
                *message = message.failed(error);
                count += 1;
            }
        }
        count
    }

    /// Keep only conversations whose id satisfies `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.conversations.retain(|c| keep(&c.model_id));
    }
}
