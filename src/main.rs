mod actions;
mod chat;
mod cli;
mod commands;
mod config;
mod console;
mod conversation;
mod error;
mod host;
mod i18n;
mod input;
mod llm;
mod prompts;
mod render;
mod session;
mod shell;
mod transcript;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::{Config, SystemInfo, state_dir};
use crate::host::SystemHost;
use crate::i18n::Language;
use crate::input::TerminalPrompter;
use crate::prompts::{Mode, build_system_prompt, load_knowledge};
use crate::session::{OpenAIConnector, Session};
use crate::shell::LoginShell;
use crate::transcript::Transcript;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SMART_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_knowledge_base(mode: Mode) -> Option<PathBuf> {
    match mode {
        Mode::Run => Some(state_dir().join("commands.md")),
        Mode::Goto => Some(state_dir().join("links.md")),
        _ => None,
    }
}

fn system_prompts(cli: &Cli, config: &Config, info: &SystemInfo) -> Result<Vec<String>> {
    if !cli.system_prompt_files.is_empty() {
        return cli
            .system_prompt_files
            .iter()
            .map(|path| {
                std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read system prompt file: {}", path.display())
                })
            })
            .collect();
    }

    let mode = cli.command.mode();
    let knowledge = cli
        .command
        .knowledge_base()
        .cloned()
        .or_else(|| default_knowledge_base(mode))
        .map(|path| load_knowledge(&path))
        .unwrap_or_default();
    Ok(vec![build_system_prompt(
        mode,
        &config.prompt.templates,
        info,
        &knowledge,
    )])
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load()?;
    let sys_info = SystemInfo::collect(config.preference.language.as_deref());
    let lang = Language::from_str(&sys_info.lang);

    let profile_name = config.startup_profile(cli.profile.as_deref());
    let profile = config
        .resolve_profile(profile_name)
        .with_context(|| format!("Failed to load profile `{profile_name}`"))?;
    tracing::debug!(profile = %profile.name, model = %profile.model, "starting");

    let prompts = system_prompts(&cli, &config, &sys_info)?;
    let shell = LoginShell::detect(config.shell.path.as_deref());
    let transcript = Transcript::from_config(&config.storage);
    let prompter = TerminalPrompter::new().context("Failed to open the terminal")?;

    let mut session = Session::new(
        config,
        profile,
        Box::new(OpenAIConnector),
        Box::new(SystemHost::new(shell)),
        Box::new(prompter),
        transcript,
        lang,
    )
    .context("Failed to connect to the model endpoint")?;
    session.seed_system_prompts(prompts);

    match cli.command {
        Commands::Chat { instruction } => chat::chat_mode(&mut session, instruction)?,
        Commands::Complete { instruction } => chat::complete_mode(&mut session, instruction)?,
        Commands::Run {
            instruction,
            extra,
            ..
        } => {
            let words: Vec<String> = instruction.into_iter().chain(extra).collect();
            let instruction = (!words.is_empty()).then(|| words.join(" "));
            actions::run_mode(&mut session, instruction)?
        }
        Commands::Goto { instruction, .. } => actions::goto_mode(&mut session, instruction)?,
        Commands::Emoji { instruction } => actions::emoji_mode(&mut session, instruction)?,
        Commands::Enhance { instruction, text } => {
            actions::enhance_mode(&mut session, instruction, text)?
        }
    }
    Ok(())
}
