//! In-band commands typed at the prompt (`/q`, `/cp 2`, `/view all`, ...).

use crate::console;
use crate::conversation::Role;
use crate::error::{Result, SmartError};
use crate::i18n::MessageKey;
use crate::session::{ACKNOWLEDGEMENT, Session};

pub const QUIT_KEYWORD: &str = "/q";

/// Number of messages `/view` shows by default: one question and its answer.
const DEFAULT_VIEW_COUNT: usize = 2;

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Quit,
    Paste,
    Copy(Option<&'a str>),
    Delete(Option<&'a str>),
    Save,
    Profile(Option<&'a str>),
    Model(Option<&'a str>),
    View(Option<&'a str>),
}

/// What the caller should do with a line after interpretation.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Send this content to the model.
    Forward(String),
    /// Handled locally; nothing to send.
    Handled,
    Quit,
}

/// Recognizes a command keyword in the first token of `line`.
pub fn parse_command(line: &str) -> Option<Command<'_>> {
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    let keyword = parts.next()?;
    let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

    let command = match keyword {
        QUIT_KEYWORD => Command::Quit,
        "/pb" | "/paste" => Command::Paste,
        "/cp" | "/copy" => Command::Copy(arg),
        "/del" | "/delete" => Command::Delete(arg),
        "/save" => Command::Save,
        "/profile" => Command::Profile(arg),
        "/model" => Command::Model(arg),
        "/view" => Command::View(arg),
        _ => return None,
    };
    Some(command)
}

fn parse_index(arg: Option<&str>) -> Result<Option<i64>> {
    arg.map(|raw| {
        raw.parse::<i64>()
            .map_err(|_| SmartError::InvalidIndex(raw.to_string()))
    })
    .transpose()
}

fn parse_view_count(arg: Option<&str>, len: usize) -> Result<usize> {
    match arg {
        None => Ok(DEFAULT_VIEW_COUNT),
        Some("all") => Ok(len),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| SmartError::InvalidIndex(raw.to_string())),
    }
}

impl Session {
    /// Interprets one line of input. Command failures are reported here and
    /// never end the session.
    pub fn interpret(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        if line.is_empty() {
            return Outcome::Handled;
        }
        let Some(command) = parse_command(line) else {
            return Outcome::Forward(line.to_string());
        };
        tracing::debug!(?command, "in-band command");
        match self.execute(command) {
            Ok(outcome) => outcome,
            Err(err) => {
                console::error(&err);
                Outcome::Handled
            }
        }
    }

    fn execute(&mut self, command: Command<'_>) -> Result<Outcome> {
        match command {
            Command::Quit => return Ok(Outcome::Quit),
            Command::Paste => {
                let pasted = self.host.read_clipboard()?;
                if pasted.trim().is_empty() {
                    console::info(self.text(MessageKey::ClipboardEmpty));
                } else {
                    self.conversation.append(Role::User, pasted);
                    self.conversation.append(Role::Assistant, ACKNOWLEDGEMENT);
                }
            }
            Command::Copy(arg) => {
                let index = parse_index(arg)?.unwrap_or(-1);
                let text = self.conversation.copy_at(index)?;
                self.host.write_clipboard(&text)?;
                console::info(self.text(MessageKey::Copied));
            }
            Command::Delete(arg) => {
                let last = self.conversation.len() as i64 - 1;
                let index = parse_index(arg)?.unwrap_or(last);
                self.conversation.delete_at(index)?;
                console::info(format!("{}{index}", self.text(MessageKey::Deleted)));
            }
            Command::Save => match self.transcript().save(&self.conversation) {
                Ok(path) => console::info(format!(
                    "{}{}",
                    self.text(MessageKey::Saved),
                    path.display()
                )),
                Err(err) => console::warn(format!("{}{err}", self.text(MessageKey::SaveFailed))),
            },
            Command::Profile(Some(name)) => {
                let name = self.switch_profile(name)?.name.clone();
                console::info(format!("{}{name}", self.text(MessageKey::ActiveProfile)));
            }
            Command::Profile(None) => {
                console::info(format!(
                    "{}{}",
                    self.text(MessageKey::ActiveProfile),
                    self.profile().name
                ));
            }
            Command::Model(Some(name)) => {
                self.conversation.set_model(name);
                console::info(format!("{}{name}", self.text(MessageKey::ActiveModel)));
            }
            Command::Model(None) => {
                console::info(format!("{}{}", self.text(MessageKey::ActiveModel), self.model()));
            }
            Command::View(arg) => {
                let count = parse_view_count(arg, self.conversation.len())?;
                match self.transcript().export_html(&self.conversation, count) {
                    Ok(path) => self.host.open(&path.display().to_string())?,
                    Err(err) => console::warn(format!("{}{err}", self.text(MessageKey::ViewFailed))),
                }
            }
        }
        Ok(Outcome::Handled)
    }
}
