use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{StorageConfig, state_dir};
use crate::conversation::Conversation;
use crate::error::Result;
use crate::render::markdown_to_html_page;

/// Where conversations are written: the rolling snapshot, explicit saves and
/// the HTML view.
#[derive(Debug, Clone)]
pub struct Transcript {
    snapshot_path: PathBuf,
    documents_dir: PathBuf,
    view_path: PathBuf,
}

impl Transcript {
    pub fn new(snapshot_path: PathBuf, documents_dir: PathBuf, view_path: PathBuf) -> Self {
        Self {
            snapshot_path,
            documents_dir,
            view_path,
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        let state = state_dir();
        let documents_dir = storage.documents_dir.clone().unwrap_or_else(|| {
            dirs::document_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("smart")
        });
        Self {
            snapshot_path: storage
                .transcript
                .clone()
                .unwrap_or_else(|| state.join("last_conversation.json")),
            documents_dir,
            view_path: state.join("view.html"),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Overwrites the last-conversation snapshot.
    pub fn write_snapshot(&self, conversation: &Conversation) -> Result<()> {
        write_json(&self.snapshot_path, &conversation.to_snapshot())
    }

    /// Saves a copy named after the conversation's start time.
    pub fn save(&self, conversation: &Conversation) -> Result<PathBuf> {
        let name = format!(
            "conversation-{}.json",
            conversation.started_at().format("%Y%m%d-%H%M%S")
        );
        let path = self.documents_dir.join(name);
        write_json(&path, &conversation.to_snapshot())?;
        Ok(path)
    }

    /// Writes the last `last_n` messages as an HTML page and returns its path.
    pub fn export_html(&self, conversation: &Conversation, last_n: usize) -> Result<PathBuf> {
        let page = markdown_to_html_page("smart conversation", &conversation.render_as_text(last_n));
        ensure_parent(&self.view_path)?;
        fs::write(&self.view_path, page)?;
        Ok(self.view_path.clone())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
