use arena_llm::{Completion, Message, Role};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an assistant reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Loading,
    Success,
    Error,
}

/// One persisted turn in a model's conversation
///
/// Assistant replies start as a `Loading` placeholder and are later swapped,
/// by id, for a `Success` or `Error` message carrying the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    /// Empty while loading or on error
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    /// Wall-clock milliseconds around the provider call (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
            model_id: None,
            status: None,
            response_time: None,
            token_count: None,
            error: None,
        }
    }

    /// Pending assistant reply for `model_id`
    pub fn placeholder(model_id: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now().timestamp_millis(),
            model_id: Some(model_id.into()),
            status: Some(MessageStatus::Loading),
            response_time: None,
            token_count: None,
            error: None,
        }
    }

    /// Final form of this placeholder after a successful call
    pub fn succeeded(&self, completion: Completion, response_time_ms: u64) -> Self {
        Self {
            content: completion.content,
            status: Some(MessageStatus::Success),
            response_time: Some(response_time_ms),
            token_count: completion.token_count,
            error: None,
            ..self.clone()
        }
    }

    /// Final form of this placeholder after a failed call
    pub fn failed(&self, error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            status: Some(MessageStatus::Error),
            response_time: None,
            token_count: None,
            error: Some(error.into()),
            ..self.clone()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == Some(MessageStatus::Loading)
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(MessageStatus::Success)
    }

    pub fn is_error(&self) -> bool {
        self.status == Some(MessageStatus::Error)
    }

    /// Usable as provider context: every user turn, and assistant turns that succeeded
    pub fn is_context(&self) -> bool {
        match self.role {
            Role::User => true,
            Role::Assistant => self.is_success(),
        }
    }

    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

fn new_message_id() -> String {
    format!("msg-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalizing_keeps_identity() {
        let placeholder = ChatMessage::placeholder("model-1");
        assert!(placeholder.is_loading());

        let done = placeholder.succeeded(Completion::new("4", Some(12)), 340);
        assert_eq!(done.id, placeholder.id);
        assert_eq!(done.timestamp, placeholder.timestamp);
        assert_eq!(done.model_id.as_deref(), Some("model-1"));
        assert_eq!(done.content, "4");
        assert_eq!(done.response_time, Some(340));
        assert_eq!(done.token_count, Some(12));
        assert!(done.is_success());

        let failed = placeholder.failed("boom");
        assert_eq!(failed.id, placeholder.id);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert_eq!(failed.response_time, None);
        assert!(failed.is_error());
    }

    #[test]
    fn test_context_filter() {
        let placeholder = ChatMessage::placeholder("m");
        assert!(ChatMessage::user("hi").is_context());
        assert!(!placeholder.is_context());
        assert!(!placeholder.failed("x").is_context());
        assert!(placeholder.succeeded(Completion::new("ok", None), 1).is_context());
    }

    #[test]
    fn test_wire_shape() {
        let msg = ChatMessage::placeholder("model-9");
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["role"], "assistant");
        assert_eq!(value["status"], "loading");
        assert_eq!(value["modelId"], "model-9");
        assert!(value.get("responseTime").is_none());
        assert!(value.get("error").is_none());
    }
}
