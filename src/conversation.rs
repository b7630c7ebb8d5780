//! The ordered message log for one dialogue, plus the bookkeeping that
//! travels with it (model, token usage, metadata, start time).

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SmartError};

/// Text that replaces the content of a deleted message.
pub const DELETED_PLACEHOLDER: &str = "[deleted]";

/// Model name prefixes of reasoning-only families that reject system messages.
const REASONING_MODEL_PREFIXES: &[&str] = &["o1"];

pub fn is_reasoning_model(model: &str) -> bool {
    REASONING_MODEL_PREFIXES
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default = "default_detail")]
    pub detail: String,
}

fn default_detail() -> String {
    "auto".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentBlock::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: default_detail(),
            },
        }
    }

    fn is_image(&self) -> bool {
        matches!(self, ContentBlock::ImageUrl { .. })
    }
}

/// Message content in the same shape the chat-completion API accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Content {
    /// Plain-text view: text blocks joined by newlines, images skipped.
    pub fn as_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn as_markdown(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => text.clone(),
                    ContentBlock::ImageUrl { image_url } => format!("![image]({})", image_url.url),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The exported/persisted shape of a conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub started_at: String,
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub token_usage: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageView<'a> {
    model: Option<&'a str>,
    messages: &'a [Message],
    token_usage: u64,
}

#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    model: Option<String>,
    token_usage: u64,
    metadata: BTreeMap<String, String>,
    started_at: DateTime<Local>,
}

impl Conversation {
    pub fn new(model: Option<String>) -> Self {
        Self {
            messages: Vec::new(),
            model,
            token_usage: 0,
            metadata: BTreeMap::new(),
            started_at: Local::now(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn token_usage(&self) -> u64 {
        self.token_usage
    }

    pub fn record_token_usage(&mut self, tokens: u64) {
        self.token_usage = tokens;
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn append(&mut self, role: Role, content: impl Into<Content>) {
        let role = self.effective_role(role);
        self.messages.push(Message::new(role, content));
    }

    /// Appends a list of parts. Parts carrying an image belong to one
    /// multimodal turn and stay together; plain text parts are separate turns.
    pub fn append_parts(&mut self, role: Role, parts: Vec<ContentBlock>) {
        if parts.is_empty() {
            return;
        }
        if parts.iter().any(ContentBlock::is_image) {
            self.append(role, Content::Blocks(parts));
            return;
        }
        for part in parts {
            if let ContentBlock::Text { text } = part {
                self.append(role, text);
            }
        }
    }

    /// Tombstones the message at `index`. Only `0..len` is accepted.
    pub fn delete_at(&mut self, index: i64) -> Result<()> {
        let idx = resolve_delete_index(index, self.messages.len())?;
        self.messages[idx].content = Content::Text(DELETED_PLACEHOLDER.to_string());
        Ok(())
    }

    /// Text of the message at `index`; negative indices count from the end.
    pub fn copy_at(&self, index: i64) -> Result<String> {
        let idx = resolve_copy_index(index, self.messages.len())?;
        Ok(self.messages[idx].content.as_text())
    }

    /// Approximates the token cost of the whole conversation from its JSON
    /// form and stores it as the current usage.
    pub fn estimate_token_usage(&mut self) -> u64 {
        let view = UsageView {
            model: self.model.as_deref(),
            messages: &self.messages,
            token_usage: self.token_usage,
        };
        let chars = serde_json::to_string(&view)
            .map(|json| json.chars().count() as u64)
            .unwrap_or(0);
        self.token_usage = chars.div_ceil(4);
        self.token_usage
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            started_at: self.started_at.to_rfc3339(),
            model: self.model.clone(),
            messages: self.messages.clone(),
            token_usage: self.token_usage,
        }
    }

    /// Markdown rendering of the last `last_n` messages, oldest first.
    pub fn render_as_text(&self, last_n: usize) -> String {
        let start = self.messages.len() - last_n.min(self.messages.len());
        self.messages[start..]
            .iter()
            .map(|msg| format!("**{}:**\n\n{}\n", msg.role.label(), msg.content.as_markdown()))
            .collect::<Vec<_>>()
            .join("\n---\n\n")
    }

    fn effective_role(&self, role: Role) -> Role {
        match (role, self.model.as_deref()) {
            (Role::System, Some(model)) if is_reasoning_model(model) => Role::User,
            _ => role,
        }
    }
}

/// `/del` rule: plain offsets only.
pub fn resolve_delete_index(index: i64, len: usize) -> Result<usize> {
    if index >= 0 && (index as u64) < len as u64 {
        Ok(index as usize)
    } else {
        Err(SmartError::Index { index, len })
    }
}

/// `/cp` rule: negative offsets count back from the end.
pub fn resolve_copy_index(index: i64, len: usize) -> Result<usize> {
    let signed_len = len as i64;
    let resolved = if index < 0 { signed_len + index } else { index };
    if (0..signed_len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(SmartError::Index { index, len })
    }
}
