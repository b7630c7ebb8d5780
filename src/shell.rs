use std::env;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{Result, SmartError};

/// Extracts the executable command from a model reply. One line is taken
/// as-is; three lines (a fenced block) yield the middle line. Leading and
/// trailing blank lines are ignored before counting.
pub fn sanitize_shell_command(content: &str) -> Result<String> {
    let content = content.trim();
    let lines: Vec<&str> = content.split('\n').collect();
    match lines.len() {
        1 => Ok(content.to_string()),
        3 => Ok(lines[1].trim().to_string()),
        _ => Err(SmartError::Parse(content.to_string())),
    }
}

/// The user's shell together with the startup file sourced before each command.
#[derive(Debug, Clone)]
pub struct LoginShell {
    pub path: String,
    pub rc: Option<PathBuf>,
}

impl LoginShell {
    pub fn detect(override_path: Option<&str>) -> Self {
        let path = override_path
            .map(str::to_string)
            .or_else(|| env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/zsh".to_string());
        let rc = dirs::home_dir().and_then(|home| rc_file(&path).map(|rc| home.join(rc)));
        Self { path, rc }
    }

    /// The script handed to `-c`: the startup file (when present) then `command`.
    pub fn script(&self, command: &str) -> String {
        match &self.rc {
            Some(rc) if rc.exists() => format!(
                "source {} >/dev/null 2>&1; {}",
                shell_quote(&rc.display().to_string()),
                command
            ),
            _ => command.to_string(),
        }
    }

    /// Runs `command` to completion with inherited stdio and returns its
    /// exit code (-1 when killed by a signal).
    pub fn run(&self, command: &str) -> Result<i32> {
        tracing::debug!(shell = %self.path, %command, "running command");
        let status = Command::new(&self.path)
            .arg("-c")
            .arg(self.script(command))
            .status()?;
        Ok(status.code().unwrap_or(-1))
    }
}

fn rc_file(shell_path: &str) -> Option<&'static str> {
    let name = shell_path.rsplit('/').next().unwrap_or(shell_path);
    match name {
        "zsh" => Some(".zshrc"),
        "bash" => Some(".bashrc"),
        "fish" => Some(".config/fish/config.fish"),
        _ => None,
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
