use std::io::{BufRead, BufReader, Lines};

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChatRequest, Completion, DeltaStream, LLMClient, check_embedded_error};
use crate::config::Profile;
use crate::conversation::{Role, is_reasoning_model};
use crate::error::{Result, SmartError};

pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAIClient {
    pub fn new(profile: &Profile) -> Result<Self> {
        let api_key = profile
            .api_key
            .clone()
            .ok_or_else(|| SmartError::MissingApiKey(profile.name.clone()))?;
        let client = Client::builder().build()?;
        Ok(Self {
            api_key,
            base_url: profile.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn post(&self, request: &ChatRequest<'_>, stream: bool) -> Result<Response> {
        let req = OaiRequest {
            model: request.model,
            messages: wire_messages(request),
            tools: request.tools,
            stream,
        };
        let endpoint = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()?;
        tracing::debug!(status = %resp.status(), stream, "chat completion response");
        Ok(resp)
    }
}

#[derive(Serialize)]
struct OaiRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u64,
}

// Data structures for streaming responses
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Reasoning-only models get their system messages as user messages.
fn wire_messages(request: &ChatRequest<'_>) -> Vec<Value> {
    let demote_system = is_reasoning_model(request.model);
    request
        .messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System if demote_system => Role::User,
                role => role,
            };
            serde_json::json!({ "role": role, "content": m.content })
        })
        .collect()
}

/// Reads the body of a failed response, preferring the provider's message.
fn fail_from_status(resp: Response) -> SmartError {
    let status = resp.status();
    match resp.json::<Value>() {
        Ok(raw) => match check_embedded_error(&raw) {
            Err(err) => err,
            Ok(()) => SmartError::Transport(format!("HTTP {status}")),
        },
        Err(_) => SmartError::Transport(format!("HTTP {status}")),
    }
}

fn parse_completion(raw: Value) -> Result<Completion> {
    check_embedded_error(&raw)?;
    let parsed: CompletionResponse = serde_json::from_value(raw)?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SmartError::Parse("completion has no choices".to_string()))?;
    Ok(Completion {
        role: choice.message.role,
        content: choice.message.content.unwrap_or_default(),
        total_tokens: parsed.usage.map(|u| u.total_tokens),
    })
}

/// Server-sent events from a streaming completion, one content delta per item.
pub struct SseStream<R> {
    lines: Lines<R>,
    done: bool,
}

impl<R: BufRead> SseStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            done: false,
        }
    }

    fn finish(&mut self, item: Option<Result<String>>) -> Option<Result<String>> {
        self.done = true;
        item
    }
}

impl<R: BufRead> Iterator for SseStream<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                None => return self.finish(None),
                Some(Err(e)) => return self.finish(Some(Err(e.into()))),
                Some(Ok(line)) => line,
            };

            // SSE format: data lines start with "data:". A bare JSON line is
            // an error body sent without the event framing.
            let Some(data) = line.strip_prefix("data:") else {
                if let Ok(raw) = serde_json::from_str::<Value>(line.trim()) {
                    if let Err(err) = check_embedded_error(&raw) {
                        return self.finish(Some(Err(err)));
                    }
                }
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                return self.finish(None);
            }

            let Ok(raw) = serde_json::from_str::<Value>(data) else {
                tracing::debug!(chunk = %data, "skipping unparsable stream chunk");
                continue;
            };
            if let Err(err) = check_embedded_error(&raw) {
                return self.finish(Some(Err(err)));
            }
            let Ok(chunk) = serde_json::from_value::<StreamChunk>(raw) else {
                continue;
            };
            if let Some(content) = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
            {
                return Some(Ok(content));
            }
        }
    }
}

impl LLMClient for OpenAIClient {
    fn complete(&self, request: &ChatRequest<'_>) -> Result<Completion> {
        let resp = self.post(request, false)?;
        if !resp.status().is_success() {
            return Err(fail_from_status(resp));
        }
        let raw: Value = resp.json()?;
        parse_completion(raw)
    }

    fn stream<'a>(&'a self, request: &ChatRequest<'_>) -> Result<DeltaStream<'a>> {
        let resp = self.post(request, true)?;
        if !resp.status().is_success() {
            return Err(fail_from_status(resp));
        }
        Ok(Box::new(SseStream::new(BufReader::new(resp))))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::json;

    use super::*;
    use crate::conversation::{Conversation, Message};
    use crate::llm::converse_stream;

    #[test]
    fn test_parse_completion() {
        let completion = parse_completion(json!({
            "choices": [{"message": {"role": "assistant", "content": "ls -la"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }))
        .unwrap();
        assert_eq!(completion.role, Role::Assistant);
        assert_eq!(completion.content, "ls -la");
        assert_eq!(completion.total_tokens, Some(13));
    }

    #[test]
    fn test_parse_completion_embedded_error() {
        let err = parse_completion(json!({"error": {"message": "invalid model"}})).unwrap_err();
        assert!(matches!(err, SmartError::LlmBackend(msg) if msg == "invalid model"));
    }

    #[test]
    fn test_parse_completion_without_choices() {
        assert!(matches!(
            parse_completion(json!({"choices": []})),
            Err(SmartError::Parse(_))
        ));
    }

    #[test]
    fn test_sse_stream_yields_deltas_until_done() {
        let body = "\
data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}

data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}
: keep-alive
data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}
data: [DONE]
data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}
";
        let deltas: Vec<String> = SseStream::new(Cursor::new(body))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(deltas, vec!["Hel", "lo"]);
    }

    #[test]
    fn test_sse_stream_surfaces_embedded_error() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\
                    data: {\"error\":{\"message\":\"overloaded\"}}\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n";
        let mut stream = SseStream::new(Cursor::new(body));
        assert_eq!(stream.next().unwrap().unwrap(), "a");
        assert!(matches!(stream.next(), Some(Err(SmartError::LlmBackend(_)))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_sse_stream_surfaces_unframed_error_body() {
        let body = "{\"error\":{\"message\":\"model not found\"}}\n";
        let mut stream = SseStream::new(Cursor::new(body));
        assert!(matches!(
            stream.next(),
            Some(Err(SmartError::LlmBackend(msg))) if msg == "model not found"
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_unframed_error_body_fails_the_streamed_turn() {
        struct CannedStream(&'static str);

        impl LLMClient for CannedStream {
            fn complete(&self, _request: &ChatRequest<'_>) -> Result<Completion> {
                unreachable!("only streaming is exercised")
            }

            fn stream<'a>(&'a self, _request: &ChatRequest<'_>) -> Result<DeltaStream<'a>> {
                Ok(Box::new(SseStream::new(Cursor::new(self.0))))
            }
        }

        let client = CannedStream("{\"error\":{\"message\":\"model not found\"}}\n");
        let mut conv = Conversation::new(None);
        conv.append(Role::User, "hi");

        let result = converse_stream(&client, &mut conv, "gpt-4o", None, &mut |_: &str| {});
        assert!(matches!(result, Err(SmartError::LlmBackend(_))));
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_request_body_carries_tools_only_when_given() {
        let messages = vec![Message::new(Role::User, "open Safari")];
        let tools = vec![json!({"type": "function", "function": {"name": "open_app"}})];

        let with_tools = serde_json::to_value(OaiRequest {
            model: "gpt-4o",
            messages: wire_messages(&ChatRequest {
                model: "gpt-4o",
                messages: &messages,
                tools: Some(tools.as_slice()),
            }),
            tools: Some(tools.as_slice()),
            stream: false,
        })
        .unwrap();
        assert_eq!(with_tools["tools"][0]["function"]["name"], "open_app");

        let without = serde_json::to_value(OaiRequest {
            model: "gpt-4o",
            messages: Vec::new(),
            tools: None,
            stream: true,
        })
        .unwrap();
        assert!(without.get("tools").is_none());
        assert_eq!(without["stream"], true);
    }

    #[test]
    fn test_wire_messages_demote_system_for_reasoning_models() {
        let messages = vec![
            Message::new(Role::System, "rules"),
            Message::new(Role::User, "hi"),
        ];
        let o1 = wire_messages(&ChatRequest {
            model: "o1-mini",
            messages: &messages,
            tools: None,
        });
        assert_eq!(o1[0]["role"], "user");
        let gpt = wire_messages(&ChatRequest {
            model: "gpt-4o",
            messages: &messages,
            tools: None,
        });
        assert_eq!(gpt[0]["role"], "system");
        assert_eq!(gpt[1]["content"], "hi");
    }

    #[test]
    fn test_client_requires_api_key() {
        let profile = Profile {
            name: "work".into(),
            api_key: None,
            model: "gpt-4o".into(),
            base_url: "https://example.invalid/v1/".into(),
        };
        assert!(matches!(
            OpenAIClient::new(&profile),
            Err(SmartError::MissingApiKey(name)) if name == "work"
        ));
    }
}
