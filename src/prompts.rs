use std::collections::HashMap;
use std::path::Path;

use crate::config::{SystemInfo, render_prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Chat,
    Complete,
    Run,
    Goto,
    Emoji,
    Enhance,
}

impl Mode {
    /// Key used for template overrides in `[prompt.templates]`.
    pub fn name(self) -> &'static str {
        match self {
            Mode::Chat => "chat",
            Mode::Complete => "complete",
            Mode::Run => "run",
            Mode::Goto => "goto",
            Mode::Emoji => "emoji",
            Mode::Enhance => "enhance",
        }
    }
}

const CHAT_TEMPLATE: &str = r#"You are a helpful assistant for an engineer working on {os} ({arch}) with {shell}.
Please answer in {lang}. Use markdown when it helps readability."#;

const COMPLETE_TEMPLATE: &str = r#"You are a concise assistant for an engineer working on {os} with {shell}.
Please answer in {lang}. Format the answer as markdown."#;

const RUN_TEMPLATE: &str = r#"You are an assistant that maps user input to predefined shell function calls.

Identify the most appropriate function from the list below. If no predefined function applies, suggest a valid {os} shell command for {shell}.
Return a fully executable shell command, including any required arguments.

Context:
- current directory: {cwd}
- shell: {shell}
- user: {user}

Functions and descriptions:
<<<knowledge_file>>>
{knowledge}
<<<end_knowledge_file>>>

Respond only with the complete shell command, either as a single line or inside a single fenced code block."#;

const GOTO_TEMPLATE: &str = r#"You map requests to web pages.

Known links:
<<<knowledge_file>>>
{knowledge}
<<<end_knowledge_file>>>

Respond only with one URL starting with https://, with no other text."#;

const EMOJI_TEMPLATE: &str =
    "Reply with exactly one emoji that best matches the user's description, with no other text.";

const ENHANCE_TEMPLATE: &str = r#"You improve writing. Rewrite the text the user gives according to their instruction.
Keep the original language and meaning. Reply only with the rewritten text."#;

pub fn default_template(mode: Mode) -> &'static str {
    match mode {
        Mode::Chat => CHAT_TEMPLATE,
        Mode::Complete => COMPLETE_TEMPLATE,
        Mode::Run => RUN_TEMPLATE,
        Mode::Goto => GOTO_TEMPLATE,
        Mode::Emoji => EMOJI_TEMPLATE,
        Mode::Enhance => ENHANCE_TEMPLATE,
    }
}

/// Renders the system prompt for `mode`, preferring a configured template.
pub fn build_system_prompt(
    mode: Mode,
    overrides: &HashMap<String, String>,
    info: &SystemInfo,
    knowledge: &str,
) -> String {
    let template = overrides
        .get(mode.name())
        .map(String::as_str)
        .unwrap_or_else(|| default_template(mode));
    let mut vars = info.to_vars();
    vars.insert("knowledge", knowledge);
    render_prompt(template, &vars)
}

/// Knowledge-base contents, or an empty string when the file is absent.
pub fn load_knowledge(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "no knowledge base");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> SystemInfo {
        SystemInfo {
            os: "macOS".into(),
            arch: "aarch64".into(),
            shell: "zsh".into(),
            lang: "en-US".into(),
            user: "dev".into(),
            cwd: "/work".into(),
        }
    }

    #[test]
    fn test_run_prompt_includes_context_and_knowledge() {
        let prompt = build_system_prompt(
            Mode::Run,
            &HashMap::new(),
            &info(),
            "deploy_app: deploys the app",
        );
        assert!(prompt.contains("current directory: /work"));
        assert!(prompt.contains("user: dev"));
        assert!(prompt.contains("deploy_app: deploys the app"));
        assert!(!prompt.contains("{knowledge}"));
    }

    #[test]
    fn test_override_template_wins() {
        let mut overrides = HashMap::new();
        overrides.insert("emoji".to_string(), "Only {lang} emoji".to_string());
        let prompt = build_system_prompt(Mode::Emoji, &overrides, &info(), "");
        assert_eq!(prompt, "Only en-US emoji");
    }

    #[test]
    fn test_missing_knowledge_is_empty() {
        assert_eq!(load_knowledge(Path::new("/no/such/kb.md")), "");
    }
}
