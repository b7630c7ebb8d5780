//! State shared by every mode: the conversation, the active profile and its
//! client, and the collaborators used to talk to the user and the OS.

use crate::config::{Config, Profile};
use crate::console;
use crate::conversation::{Conversation, Role};
use crate::error::Result;
use crate::host::Host;
use crate::i18n::{Language, MessageKey, t};
use crate::input::{LoadedInput, Prompter, load_input};
use crate::llm::openai::OpenAIClient;
use crate::llm::{LLMClient, converse, converse_stream};
use crate::transcript::Transcript;

/// Assistant reply recorded after content the user primes the dialogue with.
pub const ACKNOWLEDGEMENT: &str = "Okay.";

/// Builds a client for a resolved profile.
pub trait Connector {
    fn connect(&self, profile: &Profile) -> Result<Box<dyn LLMClient>>;
}

pub struct OpenAIConnector;

impl Connector for OpenAIConnector {
    fn connect(&self, profile: &Profile) -> Result<Box<dyn LLMClient>> {
        Ok(Box::new(OpenAIClient::new(profile)?))
    }
}

pub struct Session {
    pub conversation: Conversation,
    pub host: Box<dyn Host>,
    pub prompter: Box<dyn Prompter>,
    config: Config,
    profile: Profile,
    connector: Box<dyn Connector>,
    client: Box<dyn LLMClient>,
    transcript: Transcript,
    lang: Language,
}

impl Session {
    pub fn new(
        config: Config,
        profile: Profile,
        connector: Box<dyn Connector>,
        host: Box<dyn Host>,
        prompter: Box<dyn Prompter>,
        transcript: Transcript,
        lang: Language,
    ) -> Result<Self> {
        let client = connector.connect(&profile)?;
        Ok(Self {
            conversation: Conversation::new(Some(profile.model.clone())),
            host,
            prompter,
            config,
            profile,
            connector,
            client,
            transcript,
            lang,
        })
    }

    pub fn text(&self, key: MessageKey) -> &'static str {
        t(&self.lang, key)
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Model used for the next request.
    pub fn model(&self) -> &str {
        self.conversation.model().unwrap_or(&self.profile.model)
    }

    /// Resolves `name`, connects to it and makes it active. On failure the
    /// current profile and client stay in place.
    pub fn switch_profile(&mut self, name: &str) -> Result<&Profile> {
        let profile = self.config.resolve_profile(name)?;
        let client = self.connector.connect(&profile)?;
        tracing::info!(profile = %profile.name, model = %profile.model, "switched profile");
        self.conversation.set_model(profile.model.clone());
        self.client = client;
        self.profile = profile;
        Ok(&self.profile)
    }

    /// Seeds the system prompt(s); only meaningful before the first turn.
    pub fn seed_system_prompts(&mut self, prompts: Vec<String>) {
        for prompt in prompts {
            self.conversation.append(Role::System, prompt);
        }
    }

    /// Appends user input to the conversation. Returns whether the model
    /// should be asked for a reply (preloaded content is not sent).
    pub fn submit(&mut self, input: &str) -> Result<bool> {
        match load_input(input)? {
            LoadedInput::Text(text) => {
                self.conversation.append(Role::User, text);
                Ok(true)
            }
            LoadedInput::Turn(parts) => {
                self.conversation.append_parts(Role::User, parts);
                Ok(true)
            }
            LoadedInput::Preload(parts) => {
                self.conversation.append_parts(Role::User, parts);
                self.conversation.append(Role::Assistant, ACKNOWLEDGEMENT);
                Ok(false)
            }
        }
    }

    /// One blocking model turn, followed by a snapshot.
    pub fn ask(&mut self) -> Result<String> {
        let default_model = self.profile.model.clone();
        let reply = converse(
            self.client.as_ref(),
            &mut self.conversation,
            &default_model,
            None,
        )?;
        self.persist();
        Ok(reply)
    }

    /// One streamed model turn, followed by a snapshot.
    pub fn ask_streaming(&mut self, on_delta: &mut dyn FnMut(&str)) -> Result<String> {
        let default_model = self.profile.model.clone();
        let reply = converse_stream(
            self.client.as_ref(),
            &mut self.conversation,
            &default_model,
            None,
            on_delta,
        )?;
        self.persist();
        Ok(reply)
    }

    /// Writes the snapshot; failures are only warned about.
    pub fn persist(&self) {
        if let Err(err) = self.transcript.write_snapshot(&self.conversation) {
            tracing::debug!(path = %self.transcript.snapshot_path().display(), "snapshot failed");
            console::warn(format!("{}{err}", self.text(MessageKey::SnapshotFailed)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Outcome;
    use crate::error::SmartError;
    use crate::testing::Harness;

    #[test]
    fn test_new_session_uses_profile_model() {
        let harness = Harness::new();
        let session = harness.session();
        assert_eq!(session.model(), "gpt-4o-mini");
        assert_eq!(session.profile().name, "default");
        assert!(session.conversation.is_empty());
    }

    #[test]
    fn test_switch_profile_changes_model_and_client() {
        let harness = Harness::new();
        let mut session = harness.session();
        let profile = session.switch_profile("work").unwrap();
        assert_eq!(profile.model, "gpt-4o");
        assert_eq!(session.model(), "gpt-4o");
        assert_eq!(harness.connected_profiles(), vec!["default", "work"]);
    }

    #[test]
    fn test_switch_to_unknown_profile_keeps_current() {
        let harness = Harness::new();
        let mut session = harness.session();
        assert!(matches!(
            session.switch_profile("ghost"),
            Err(SmartError::ProfileNotFound(_))
        ));
        assert_eq!(session.profile().name, "default");
        assert_eq!(session.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_ask_persists_snapshot() {
        let harness = Harness::new();
        harness.client.push_completion("hi back", None);
        let mut session = harness.session();
        session.submit("hi").unwrap();
        assert_eq!(session.ask().unwrap(), "hi back");
        assert!(session.transcript().snapshot_path().exists());
        assert!(session.conversation.token_usage() > 0);
    }

    #[test]
    fn test_storage_failures_do_not_abort_the_turn() {
        let harness = Harness::new();
        harness.client.push_completion("still here", None);
        let mut session = harness.session_with_unwritable_storage();

        session.submit("hi").unwrap();
        assert_eq!(session.ask().unwrap(), "still here");
        assert_eq!(session.conversation.len(), 2);
        assert!(!session.transcript().snapshot_path().exists());

        assert_eq!(session.interpret("/save"), Outcome::Handled);
        assert_eq!(session.interpret("/view all"), Outcome::Handled);
        assert!(harness.host.opened().is_empty());
        assert_eq!(session.conversation.len(), 2);
    }

    #[test]
    fn test_preload_is_not_sent() {
        let harness = Harness::new();
        let path = harness.dir.path().join("context.md");
        std::fs::write(&path, "project notes").unwrap();
        let mut session = harness.session();

        let send = session
            .submit(&format!("preload:file://{}", path.display()))
            .unwrap();
        assert!(!send);
        assert_eq!(session.conversation.len(), 2);
        assert_eq!(session.conversation.copy_at(-1).unwrap(), ACKNOWLEDGEMENT);
    }

    #[test]
    fn test_system_prompts_on_reasoning_model() {
        let harness = Harness::new();
        let mut session = harness.session();
        session.switch_profile("reasoner").unwrap();
        session.seed_system_prompts(vec!["rules".into()]);
        assert_eq!(session.conversation.messages()[0].role, Role::User);
    }
}
