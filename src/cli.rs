use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::prompts::Mode;

#[derive(Parser, Debug)]
#[command(name = "smart", version, about = "Natural-language assistant for the shell")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Replace the built-in system prompt with the contents of this file (repeatable)
    #[arg(short = 's', long = "system-prompt-file", global = true)]
    pub system_prompt_files: Vec<PathBuf>,

    /// Profile from the config file to start with
    #[arg(short, long, global = true)]
    pub profile: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat with streamed replies
    Chat {
        #[arg(short, long)]
        instruction: Option<String>,
    },
    /// One completion, printed as formatted text
    Complete {
        #[arg(short, long)]
        instruction: Option<String>,
    },
    /// Turn instructions into shell commands and run them after confirmation
    Run {
        #[arg(short, long)]
        instruction: Option<String>,
        /// Knowledge base appended to the system prompt
        #[arg(long)]
        kb: Option<PathBuf>,
        /// Further words of the instruction
        #[arg(trailing_var_arg = true)]
        extra: Vec<String>,
    },
    /// Find a link and open it in the browser
    Goto {
        #[arg(short, long)]
        instruction: Option<String>,
        #[arg(long)]
        kb: Option<PathBuf>,
    },
    /// Pick an emoji and copy it to the clipboard
    Emoji {
        #[arg(short, long)]
        instruction: Option<String>,
    },
    /// Rewrite text and copy the result to the clipboard
    Enhance {
        #[arg(short, long)]
        instruction: Option<String>,
        /// Text to rewrite; the clipboard is used when absent
        #[arg(short, long)]
        text: Option<String>,
    },
}

impl Commands {
    pub fn mode(&self) -> Mode {
        match self {
            Commands::Chat { .. } => Mode::Chat,
            Commands::Complete { .. } => Mode::Complete,
            Commands::Run { .. } => Mode::Run,
            Commands::Goto { .. } => Mode::Goto,
            Commands::Emoji { .. } => Mode::Emoji,
            Commands::Enhance { .. } => Mode::Enhance,
        }
    }

    /// Knowledge base given with `--kb`, if the mode takes one.
    pub fn knowledge_base(&self) -> Option<&PathBuf> {
        match self {
            Commands::Run { kb, .. } | Commands::Goto { kb, .. } => kb.as_ref(),
            _ => None,
        }
    }
}
