use arena_persist::ChatMessage;
use serde::Serialize;

/// Terminal result of one model's call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOutcome {
    pub model_id: String,
    pub model_name: String,
    /// The success or error message that replaced the placeholder
    pub message: ChatMessage,
}

impl ModelOutcome {
    pub fn is_success(&self) -> bool {
        self.message.is_success()
    }
}

/// Everything one dispatch produced, in model-list order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub prompt: String,
    pub outcomes: Vec<ModelOutcome>,
    pub elapsed_ms: u64,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn outcome(&self, model_id: &str) -> Option<&ModelOutcome> {
        self.outcomes.iter().find(|o| o.model_id == model_id)
    }
}
