//! OS conveniences the action loops rely on: clipboard, opening links and
//! files, and running shell commands.

use std::process::Command;

use crate::error::{Result, SmartError};
use crate::shell::LoginShell;

pub trait Host {
    fn read_clipboard(&mut self) -> Result<String>;

    fn write_clipboard(&mut self, text: &str) -> Result<()>;

    /// Opens a URL or file with the desktop's default handler.
    fn open(&mut self, target: &str) -> Result<()>;

    /// Runs a shell command to completion and returns its exit code.
    fn run_shell(&mut self, command: &str) -> Result<i32>;
}

pub struct SystemHost {
    clipboard: Option<arboard::Clipboard>,
    shell: LoginShell,
}

impl SystemHost {
    pub fn new(shell: LoginShell) -> Self {
        Self {
            clipboard: None,
            shell,
        }
    }

    fn clipboard(&mut self) -> Result<&mut arboard::Clipboard> {
        if self.clipboard.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| SmartError::Clipboard(e.to_string()))?;
            self.clipboard = Some(clipboard);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| SmartError::Clipboard("clipboard unavailable".to_string()))
    }
}

impl Host for SystemHost {
    fn read_clipboard(&mut self) -> Result<String> {
        self.clipboard()?
            .get_text()
            .map_err(|e| SmartError::Clipboard(e.to_string()))
    }

    fn write_clipboard(&mut self, text: &str) -> Result<()> {
        let err = match self.clipboard() {
            Ok(clipboard) => match clipboard.set_text(text.to_string()) {
                Ok(()) => return Ok(()),
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        // No clipboard (e.g. headless session): leave the text in a file instead.
        let path = std::env::temp_dir().join("smart-clipboard.txt");
        std::fs::write(&path, text)?;
        Err(SmartError::Clipboard(format!(
            "{err}; wrote to {} instead",
            path.display()
        )))
    }

    fn open(&mut self, target: &str) -> Result<()> {
        tracing::debug!(%target, "opening");
        open_command(target).spawn()?;
        Ok(())
    }

    fn run_shell(&mut self, command: &str) -> Result<i32> {
        self.shell.run(command)
    }
}

#[cfg(target_os = "macos")]
fn open_command(target: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(target);
    cmd
}

#[cfg(target_os = "windows")]
fn open_command(target: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", target]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn open_command(target: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(target);
    cmd
}
