pub mod openai;

use serde_json::Value;

use crate::conversation::{Conversation, Message, Role};
use crate::error::{Result, SmartError};

pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    /// Function definitions offered to the model, in the provider's JSON shape.
    pub tools: Option<&'a [Value]>,
}

#[derive(Clone, Debug)]
pub struct Completion {
    pub role: Role,
    pub content: String,
    /// Provider-reported total for the request, when the backend sends one.
    pub total_tokens: Option<u64>,
}

/// Content deltas of one streamed reply. Finite, pulled once.
pub type DeltaStream<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

pub trait LLMClient {
    fn complete(&self, request: &ChatRequest<'_>) -> Result<Completion>;

    fn stream<'a>(&'a self, request: &ChatRequest<'_>) -> Result<DeltaStream<'a>>;
}

/// Fails with the provider's message when a raw response carries `error`.
pub fn check_embedded_error(raw: &Value) -> Result<()> {
    match raw.get("error") {
        Some(err) if !err.is_null() => {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            Err(SmartError::LlmBackend(message))
        }
        _ => Ok(()),
    }
}

/// One blocking completion; the reply is appended and usage taken from the
/// provider when reported.
pub fn converse(
    client: &dyn LLMClient,
    conversation: &mut Conversation,
    default_model: &str,
    tools: Option<&[Value]>,
) -> Result<String> {
    let model = conversation.model().unwrap_or(default_model).to_string();
    tracing::debug!(%model, messages = conversation.len(), "requesting completion");
    let completion = client.complete(&ChatRequest {
        model: &model,
        messages: conversation.messages(),
        tools,
    })?;

    conversation.append(completion.role, completion.content.clone());
    match completion.total_tokens {
        Some(total) => conversation.record_token_usage(total),
        None => {
            conversation.estimate_token_usage();
        }
    }
    Ok(completion.content)
}

/// Drains a streamed completion, handing every non-empty delta to
/// `on_delta`. The assistant message is appended only once the stream ends,
/// and never for a stream that produced no content.
pub fn converse_stream(
    client: &dyn LLMClient,
    conversation: &mut Conversation,
    default_model: &str,
    tools: Option<&[Value]>,
    on_delta: &mut dyn FnMut(&str),
) -> Result<String> {
    let model = conversation.model().unwrap_or(default_model).to_string();
    tracing::debug!(%model, messages = conversation.len(), "requesting streamed completion");
    let stream = client.stream(&ChatRequest {
        model: &model,
        messages: conversation.messages(),
        tools,
    })?;

    let mut reply = String::new();
    for delta in stream {
        let delta = delta?;
        if delta.is_empty() {
            continue;
        }
        on_delta(&delta);
        reply.push_str(&delta);
    }
    if reply.is_empty() {
        return Err(SmartError::LlmBackend(
            "stream ended without any content".to_string(),
        ));
    }

    conversation.append(Role::Assistant, reply.clone());
    // Streamed turns carry no usage figure.
    conversation.estimate_token_usage();
    Ok(reply)
}
