//! Scripted stand-ins for the model, the OS and the terminal.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;
use tempfile::TempDir;

use crate::config::{Config, Profile};
use crate::conversation::{Message, Role};
use crate::error::{Result, SmartError};
use crate::host::Host;
use crate::i18n::Language;
use crate::input::Prompter;
use crate::llm::{ChatRequest, Completion, DeltaStream, LLMClient};
use crate::session::{Connector, Session};
use crate::transcript::Transcript;

enum Scripted {
    Completion(Completion),
    Error(SmartError),
    Stream(Vec<Result<String>>),
}

#[derive(Default)]
struct ClientState {
    replies: VecDeque<Scripted>,
    requests: Vec<(String, Vec<Message>)>,
    tools: Vec<Option<Vec<Value>>>,
}

#[derive(Clone, Default)]
pub struct ScriptedClient {
    state: Rc<RefCell<ClientState>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_completion(&self, content: &str, total_tokens: Option<u64>) {
        self.state
            .borrow_mut()
            .replies
            .push_back(Scripted::Completion(Completion {
                role: Role::Assistant,
                content: content.to_string(),
                total_tokens,
            }));
    }

    pub fn push_error(&self, err: SmartError) {
        self.state.borrow_mut().replies.push_back(Scripted::Error(err));
    }

    pub fn push_stream(&self, deltas: Vec<Result<String>>) {
        self.state
            .borrow_mut()
            .replies
            .push_back(Scripted::Stream(deltas));
    }

    pub fn requested_models(&self) -> Vec<String> {
        self.state
            .borrow()
            .requests
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }

    /// Messages sent with each request, in order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.state
            .borrow()
            .requests
            .iter()
            .map(|(_, messages)| messages.clone())
            .collect()
    }

    /// Tools sent with each request, in order.
    pub fn requested_tools(&self) -> Vec<Option<Vec<Value>>> {
        self.state.borrow().tools.clone()
    }

    fn next(&self, request: &ChatRequest<'_>) -> Result<Scripted> {
        let mut state = self.state.borrow_mut();
        state
            .requests
            .push((request.model.to_string(), request.messages.to_vec()));
        state.tools.push(request.tools.map(<[Value]>::to_vec));
        state
            .replies
            .pop_front()
            .ok_or_else(|| SmartError::Transport("no scripted reply left".into()))
    }
}

impl LLMClient for ScriptedClient {
    fn complete(&self, request: &ChatRequest<'_>) -> Result<Completion> {
        match self.next(request)? {
            Scripted::Completion(completion) => Ok(completion),
            Scripted::Error(err) => Err(err),
            Scripted::Stream(deltas) => Ok(Completion {
                role: Role::Assistant,
                content: deltas.into_iter().collect::<Result<String>>()?,
                total_tokens: None,
            }),
        }
    }

    fn stream<'a>(&'a self, request: &ChatRequest<'_>) -> Result<DeltaStream<'a>> {
        match self.next(request)? {
            Scripted::Completion(completion) => {
                Ok(Box::new(std::iter::once(Ok(completion.content))))
            }
            Scripted::Error(err) => Err(err),
            Scripted::Stream(deltas) => Ok(Box::new(deltas.into_iter())),
        }
    }
}

struct ScriptedConnector {
    client: ScriptedClient,
    connected: Rc<RefCell<Vec<String>>>,
}

impl Connector for ScriptedConnector {
    fn connect(&self, profile: &Profile) -> Result<Box<dyn LLMClient>> {
        self.connected.borrow_mut().push(profile.name.clone());
        Ok(Box::new(self.client.clone()))
    }
}

#[derive(Default)]
struct HostState {
    clipboard: Option<String>,
    opened: Vec<String>,
    commands: Vec<String>,
    exit_codes: VecDeque<i32>,
}

#[derive(Clone, Default)]
pub struct FakeHost {
    state: Rc<RefCell<HostState>>,
}

impl FakeHost {
    pub fn set_clipboard(&self, text: &str) {
        self.state.borrow_mut().clipboard = Some(text.to_string());
    }

    pub fn clipboard(&self) -> Option<String> {
        self.state.borrow().clipboard.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.borrow().opened.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    /// Exit code for the next shell command (0 when none is queued).
    pub fn push_exit_code(&self, code: i32) {
        self.state.borrow_mut().exit_codes.push_back(code);
    }
}

impl Host for FakeHost {
    fn read_clipboard(&mut self) -> Result<String> {
        Ok(self.state.borrow().clipboard.clone().unwrap_or_default())
    }

    fn write_clipboard(&mut self, text: &str) -> Result<()> {
        self.set_clipboard(text);
        Ok(())
    }

    fn open(&mut self, target: &str) -> Result<()> {
        self.state.borrow_mut().opened.push(target.to_string());
        Ok(())
    }

    fn run_shell(&mut self, command: &str) -> Result<i32> {
        let mut state = self.state.borrow_mut();
        state.commands.push(command.to_string());
        Ok(state.exit_codes.pop_front().unwrap_or(0))
    }
}

pub enum Reply {
    Line(&'static str),
    /// Enter on an untouched prompt: empty line, or the offered default.
    Accept,
    Eof,
}

#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    replies: Rc<RefCell<VecDeque<Reply>>>,
    offered: Rc<RefCell<Vec<String>>>,
}

impl ScriptedPrompter {
    pub fn push(&self, reply: Reply) {
        self.replies.borrow_mut().push_back(reply);
    }

    /// Defaults offered through `edit`, in order.
    pub fn offered(&self) -> Vec<String> {
        self.offered.borrow().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(match self.replies.borrow_mut().pop_front() {
            Some(Reply::Line(line)) => Some(line.to_string()),
            Some(Reply::Accept) => Some(String::new()),
            Some(Reply::Eof) | None => None,
        })
    }

    fn edit(&mut self, _prompt: &str, initial: &str) -> Result<Option<String>> {
        self.offered.borrow_mut().push(initial.to_string());
        Ok(match self.replies.borrow_mut().pop_front() {
            Some(Reply::Line(line)) => Some(line.to_string()),
            Some(Reply::Accept) => Some(initial.to_string()),
            Some(Reply::Eof) | None => None,
        })
    }
}

const TEST_CONFIG: &str = r#"
[profiles.work]
api_key = "sk-work"
model = "gpt-4o"

[profiles.reasoner]
api_key = "sk-work"
model = "o1-preview"
"#;

/// A session wired to fakes, with its files under a temp dir.
pub struct Harness {
    pub dir: TempDir,
    pub client: ScriptedClient,
    pub host: FakeHost,
    pub prompter: ScriptedPrompter,
    connected: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            client: ScriptedClient::new(),
            host: FakeHost::default(),
            prompter: ScriptedPrompter::default(),
            connected: Rc::default(),
        }
    }

    pub fn session(&self) -> Session {
        let transcript = Transcript::new(
            self.dir.path().join("state").join("last_conversation.json"),
            self.dir.path().join("docs"),
            self.dir.path().join("state").join("view.html"),
        );
        self.session_with_transcript(transcript)
    }

    /// A session whose transcript files all sit below a regular file, so
    /// every write fails.
    pub fn session_with_unwritable_storage(&self) -> Session {
        let blocker = self.dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("blocker file");
        let transcript = Transcript::new(
            blocker.join("last_conversation.json"),
            blocker.join("docs"),
            blocker.join("view.html"),
        );
        self.session_with_transcript(transcript)
    }

    fn session_with_transcript(&self, transcript: Transcript) -> Session {
        let config: Config = toml::from_str(TEST_CONFIG).expect("test config");
        let profile = Profile {
            name: "default".into(),
            api_key: Some("sk-test".into()),
            model: "gpt-4o-mini".into(),
            base_url: "http://localhost:9/v1".into(),
        };
        let connector = ScriptedConnector {
            client: self.client.clone(),
            connected: self.connected.clone(),
        };
        Session::new(
            config,
            profile,
            Box::new(connector),
            Box::new(self.host.clone()),
            Box::new(self.prompter.clone()),
            transcript,
            Language::En,
        )
        .expect("session")
    }

    pub fn connected_profiles(&self) -> Vec<String> {
        self.connected.borrow().clone()
    }
}
