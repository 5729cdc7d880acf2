pub mod azure_openai;
pub mod bedrock;
pub mod gemini;
pub mod openai;

pub use azure_openai::AzureOpenAIAdapter;
pub use bedrock::BedrockAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAIAdapter;

use reqwest::RequestBuilder;
use serde_json::Value;

use crate::error::{LlmError, Result};
use crate::traits::Completion;

/// Send a JSON request and return the parsed JSON body
///
/// Non-success statuses become `LlmError::Provider` carrying the message found
/// at `error_pointer` in the body, or `"<label> API error: <status text>"`.
pub(crate) async fn send_json(
    request: RequestBuilder,
    label: &str,
    error_pointer: &str,
) -> Result<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::provider(format!("{} request failed: {}", label, e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::provider(format!("{} response read failed: {}", label, e)))?;

    if !status.is_success() {
        tracing::warn!(provider = label, status = %status, "Provider returned an error status");
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer(error_pointer)
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                format!(
                    "{} API error: {}",
                    label,
                    status.canonical_reason().unwrap_or(status.as_str())
                )
            });
        return Err(LlmError::provider(message));
    }

    serde_json::from_str(&body)
        .map_err(|e| LlmError::provider(format!("Failed to parse {} response: {}", label, e)))
}

/// `choices[0].message.content` + `usage.total_tokens`, shared by OpenAI and Azure
pub(crate) fn parse_chat_completion(body: &Value) -> Completion {
    Completion::new(
        str_at(body, "/choices/0/message/content"),
        u32_at(body, "/usage/total_tokens"),
    )
}

pub(crate) fn str_at(body: &Value, pointer: &str) -> String {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn u32_at(body: &Value, pointer: &str) -> Option<u32> {
    body.pointer(pointer)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}
