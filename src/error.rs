use thiserror::Error;

/// Failures that end a single turn or command without ending the session.
#[derive(Debug, Error)]
pub enum SmartError {
    /// The completion backend answered with an embedded `error` payload.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// A model reply did not have the shape the current mode expects.
    #[error("response is not parsable: {0}")]
    Parse(String),

    #[error("index {index} is out of range for {len} messages")]
    Index { index: i64, len: usize },

    #[error("invalid index: {0}")]
    InvalidIndex(String),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("no API key for profile '{0}' (set api_key in the config or OPENAI_API_KEY)")]
    MissingApiKey(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// HTTP or stream-level failure talking to the backend.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SmartError {
    fn from(err: reqwest::Error) -> Self {
        SmartError::Transport(err.to_string())
    }
}

pub type Result<T, E = SmartError> = std::result::Result<T, E>;
