use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::conversation::ContentBlock;
use crate::error::{Result, SmartError};

/// Line input for the interactive loops. `None` means end of input.
pub trait Prompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Like `read_line`, with `initial` pre-filled for editing.
    fn edit(&mut self, prompt: &str, initial: &str) -> Result<Option<String>>;
}

/// rustyline on a TTY, plain stdin lines otherwise.
pub struct TerminalPrompter {
    editor: Option<DefaultEditor>,
}

impl TerminalPrompter {
    pub fn new() -> Result<Self> {
        let editor = if io::stdin().is_terminal() {
            Some(DefaultEditor::new().map_err(readline_error)?)
        } else {
            None
        };
        Ok(Self { editor })
    }

    fn read_plain(prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

fn readline_error(err: ReadlineError) -> SmartError {
    SmartError::Io(io::Error::other(err.to_string()))
}

fn interpret_readline(result: rustyline::Result<String>) -> Result<Option<String>> {
    match result {
        Ok(line) => Ok(Some(line)),
        // Ctrl-C drops the current line but keeps the loop alive.
        Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
        Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(readline_error(err)),
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let Some(editor) = self.editor.as_mut() else {
            return Self::read_plain(prompt);
        };
        let line = interpret_readline(editor.readline(prompt))?;
        if let Some(line) = &line {
            if !line.trim().is_empty() {
                let _ = editor.add_history_entry(line.as_str());
            }
        }
        Ok(line)
    }

    fn edit(&mut self, prompt: &str, initial: &str) -> Result<Option<String>> {
        let Some(editor) = self.editor.as_mut() else {
            let hint = format!("{prompt}(defaults to `{initial}`): ");
            return Ok(Self::read_plain(&hint)?.map(|line| {
                if line.trim().is_empty() {
                    initial.to_string()
                } else {
                    line
                }
            }));
        };
        interpret_readline(editor.readline_with_initial(prompt, (initial, "")))
    }
}

/// What a line of user input turns into before it reaches the conversation.
#[derive(Debug, PartialEq)]
pub enum LoadedInput {
    Text(String),
    /// A turn assembled from `file://` content.
    Turn(Vec<ContentBlock>),
    /// `preload:file://` content, recorded without asking the model.
    Preload(Vec<ContentBlock>),
}

const PRELOAD_PREFIX: &str = "preload:file://";
const FILE_PREFIX: &str = "file://";

pub fn load_input(line: &str) -> Result<LoadedInput> {
    if let Some(rest) = line.strip_prefix(PRELOAD_PREFIX) {
        return Ok(LoadedInput::Preload(load_file_turn(rest)?));
    }
    if let Some(rest) = line.strip_prefix(FILE_PREFIX) {
        return Ok(LoadedInput::Turn(load_file_turn(rest)?));
    }
    Ok(LoadedInput::Text(line.to_string()))
}

/// `PATH [words...]`: the words come first, then the file. Text files are
/// merged into one text block; images become a separate image block.
fn load_file_turn(rest: &str) -> Result<Vec<ContentBlock>> {
    let mut parts = rest.trim().splitn(2, char::is_whitespace);
    let path = Path::new(parts.next().unwrap_or_default());
    let words = parts.next().map(str::trim).unwrap_or_default();

    if let Some(mime) = image_mime(path) {
        let bytes = std::fs::read(path)?;
        let url = format!("data:{mime};base64,{}", STANDARD.encode(bytes));
        let mut blocks = Vec::new();
        if !words.is_empty() {
            blocks.push(ContentBlock::text(words));
        }
        blocks.push(ContentBlock::image(url));
        return Ok(blocks);
    }

    let file = std::fs::read_to_string(path)?;
    let text = if words.is_empty() {
        file
    } else {
        format!("{words}\n\n{file}")
    };
    Ok(vec![ContentBlock::text(text)])
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
