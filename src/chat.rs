use crate::commands::Outcome;
use crate::console;
use crate::error::Result;
use crate::i18n::MessageKey;
use crate::render::markdown_to_terminal;
use crate::session::Session;

/// Next line of input: the pending instruction first, then the prompt.
/// `None` at end of input.
pub(crate) fn next_line(
    session: &mut Session,
    pending: &mut Option<String>,
    key: MessageKey,
) -> Result<Option<String>> {
    if let Some(line) = pending.take() {
        return Ok(Some(line));
    }
    let prompt = session.text(key);
    session.prompter.read_line(prompt)
}

/// Interactive chat with streamed replies.
pub fn chat_mode(session: &mut Session, instruction: Option<String>) -> Result<()> {
    console::hint(session.text(MessageKey::WelcomeChat));
    let mut pending = instruction;

    while let Some(line) = next_line(session, &mut pending, MessageKey::PromptUser)? {
        let content = match session.interpret(&line) {
            Outcome::Quit => break,
            Outcome::Handled => continue,
            Outcome::Forward(content) => content,
        };

        match session.submit(&content) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                console::error(&err);
                continue;
            }
        }

        let result = session.ask_streaming(&mut |delta| console::fragment(delta));
        println!();
        if let Err(err) = result {
            console::error(&err);
        }
    }
    Ok(())
}

/// A single completion, rendered as formatted text.
pub fn complete_mode(session: &mut Session, instruction: Option<String>) -> Result<()> {
    let mut pending = instruction;
    let Some(line) = next_line(session, &mut pending, MessageKey::PromptUser)? else {
        return Ok(());
    };
    let Outcome::Forward(content) = session.interpret(&line) else {
        return Ok(());
    };
    if session.submit(&content)? {
        let reply = session.ask()?;
        println!("{}", markdown_to_terminal(&reply));
    }
    Ok(())
}
