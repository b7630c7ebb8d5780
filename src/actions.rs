//! The command, link, emoji and enhancement loops.

use crate::chat::next_line;
use crate::commands::{Outcome, QUIT_KEYWORD};
use crate::console;
use crate::conversation::Role;
use crate::error::{Result, SmartError};
use crate::i18n::MessageKey;
use crate::session::Session;
use crate::shell::sanitize_shell_command;

/// Metadata key holding the last command that was executed.
pub const LAST_COMMAND_KEY: &str = "last_command";

/// Run-mode keyword that offers the last executed command again.
pub const REPEAT_KEYWORD: &str = "/r";

const REGENERATE_NOTE: &str = "That is not what I want. Please suggest a different command.";
const ABORT_NOTE: &str = "User aborted the command.";
const URL_ONLY_NOTE: &str = "Reply with only a URL starting with https://.";

/// Attempts per instruction before giving up on getting a URL.
const GOTO_ATTEMPTS: usize = 3;

const DEFAULT_ENHANCE_INSTRUCTION: &str = "Improve the following text.";

/// How the user answered a proposed command.
#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    Regenerate,
    Abort,
    Run(String),
}

/// Trailing `!` regenerates, trailing `~` or the quit keyword aborts, a
/// leading `!` runs the rest as typed; anything else runs.
pub fn interpret_confirmation(text: &str) -> Decision {
    let text = text.trim();
    if text.ends_with('!') {
        Decision::Regenerate
    } else if text.is_empty() || text.ends_with('~') || text == QUIT_KEYWORD {
        Decision::Abort
    } else if let Some(verbatim) = text.strip_prefix('!') {
        Decision::Run(verbatim.trim().to_string())
    } else {
        Decision::Run(text.to_string())
    }
}

/// Shared loop for the modes that act on one instruction at a time.
fn instruction_loop(
    session: &mut Session,
    instruction: Option<String>,
    mut handle: impl FnMut(&mut Session, &str) -> Result<()>,
) -> Result<()> {
    let mut pending = instruction;
    while let Some(line) = next_line(session, &mut pending, MessageKey::PromptInstruction)? {
        let content = match session.interpret(&line) {
            Outcome::Quit => break,
            Outcome::Handled => continue,
            Outcome::Forward(content) => content,
        };
        if let Err(err) = handle(session, &content) {
            console::error(&err);
        }
    }
    Ok(())
}

/// Natural language to shell command, confirmed before it runs.
pub fn run_mode(session: &mut Session, instruction: Option<String>) -> Result<()> {
    console::hint(session.text(MessageKey::WelcomeRun));
    let mut pending = instruction;

    while let Some(line) = next_line(session, &mut pending, MessageKey::PromptInstruction)? {
        if line.trim() == REPEAT_KEYWORD {
            if let Err(err) = repeat_last(session) {
                console::error(&err);
            }
            continue;
        }
        let content = match session.interpret(&line) {
            Outcome::Quit => break,
            Outcome::Handled => continue,
            Outcome::Forward(content) => content,
        };
        if let Err(err) = propose(session, &content) {
            console::error(&err);
        }
    }
    Ok(())
}

fn propose(session: &mut Session, instruction: &str) -> Result<()> {
    if !session.submit(instruction)? {
        return Ok(());
    }
    loop {
        let reply = session.ask()?;
        let command = sanitize_shell_command(&reply)?;
        match confirm(session, &command)? {
            Decision::Regenerate => {
                session.conversation.append(Role::User, REGENERATE_NOTE);
            }
            Decision::Abort => {
                session.conversation.append(Role::User, ABORT_NOTE);
                session.persist();
                return Ok(());
            }
            Decision::Run(command) => return execute(session, &command),
        }
    }
}

fn confirm(session: &mut Session, command: &str) -> Result<Decision> {
    console::hint(session.text(MessageKey::ConfirmHint));
    let prompt = session.text(MessageKey::PromptConfirm);
    Ok(match session.prompter.edit(prompt, command)? {
        Some(text) => interpret_confirmation(&text),
        None => Decision::Abort,
    })
}

/// Runs `command`, reports its status and records the outcome as a user turn.
fn execute(session: &mut Session, command: &str) -> Result<()> {
    let code = session.host.run_shell(command)?;
    console::status(
        format!("{}{code}", session.text(MessageKey::ExitedWithCode)),
        code == 0,
    );
    session.conversation.set_meta(LAST_COMMAND_KEY, command);
    session
        .conversation
        .append(Role::User, format!("User ran `{command}`, exited with code {code}"));
    session.persist();
    Ok(())
}

fn repeat_last(session: &mut Session) -> Result<()> {
    let Some(last) = session.conversation.meta(LAST_COMMAND_KEY).map(str::to_string) else {
        console::info(session.text(MessageKey::NoLastCommand));
        return Ok(());
    };
    match confirm(session, &last)? {
        Decision::Run(command) => execute(session, &command),
        Decision::Regenerate | Decision::Abort => Ok(()),
    }
}

/// Natural language to a link, opened in the browser.
pub fn goto_mode(session: &mut Session, instruction: Option<String>) -> Result<()> {
    instruction_loop(session, instruction, |session, content| {
        if !session.submit(content)? {
            return Ok(());
        }
        let url = fetch_url(session)?;
        console::info(format!("{}{url}", session.text(MessageKey::Opening)));
        session.host.open(&url)
    })
}

/// Asks until the reply is an https URL, at most `GOTO_ATTEMPTS` times.
fn fetch_url(session: &mut Session) -> Result<String> {
    let mut last = String::new();
    for attempt in 1..=GOTO_ATTEMPTS {
        let reply = session.ask()?.trim().to_string();
        if reply.starts_with("https://") {
            return Ok(reply);
        }
        tracing::debug!(attempt, %reply, "reply is not a URL");
        if attempt < GOTO_ATTEMPTS {
            session.conversation.append(Role::User, URL_ONLY_NOTE);
        }
        last = reply;
    }
    Err(SmartError::Parse(format!(
        "no https:// URL after {GOTO_ATTEMPTS} attempts (last reply: {last})"
    )))
}

/// Natural language to one emoji, copied to the clipboard.
pub fn emoji_mode(session: &mut Session, instruction: Option<String>) -> Result<()> {
    instruction_loop(session, instruction, ask_and_copy)
}

/// Rewrites text and copies the result; later inputs refine the last rewrite.
pub fn enhance_mode(
    session: &mut Session,
    instruction: Option<String>,
    text: Option<String>,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => session.host.read_clipboard().unwrap_or_else(|err| {
            console::warn(&err);
            String::new()
        }),
    };
    let instruction = instruction.unwrap_or_else(|| DEFAULT_ENHANCE_INSTRUCTION.to_string());
    let first = if text.trim().is_empty() {
        instruction
    } else {
        format!("{instruction}\n\n{text}")
    };

    if let Err(err) = ask_and_copy(session, &first) {
        console::error(&err);
    }
    instruction_loop(session, None, ask_and_copy)
}

fn ask_and_copy(session: &mut Session, content: &str) -> Result<()> {
    if !session.submit(content)? {
        return Ok(());
    }
    let reply = session.ask()?.trim().to_string();
    console::info(&reply);
    session.host.write_clipboard(&reply)?;
    console::hint(session.text(MessageKey::Copied));
    Ok(())
}
