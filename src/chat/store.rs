use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::ChatSession;

/// File name of the export artifact written by save-and-clear.
pub const EXPORT_FILE_NAME: &str = "arkcom_chat_history.json";

const HISTORY_FILE_NAME: &str = "history.json";

/// Persists the whole session collection as one JSON document.
///
/// The stored file is the sole source of truth on startup; anything
/// unreadable is replaced by an empty collection rather than surfaced as a
/// failure.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Create a store rooted at `storage_dir`, creating the directory if
    /// needed.
    pub fn new(storage_dir: &Path) -> Result<Self> {
        if !storage_dir.exists() {
            fs::create_dir_all(storage_dir).with_context(|| {
                format!("Failed to create storage directory: {}", storage_dir.display())
            })?;
        }
        Ok(Self {
            path: storage_dir.join(HISTORY_FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored collection. Missing or corrupt data yields an empty
    /// collection; corruption is logged, never propagated.
    pub fn load(&self) -> Vec<ChatSession> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&json) {
            Ok(sessions) => sessions,
            Err(e) => {
                eprintln!(
                    "{} Failed to parse chat history at {}: {}",
                    "⚠️".yellow(),
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Write the full collection. An empty collection removes the stored
    /// entry instead of persisting an empty list.
    pub fn save(&self, sessions: &[ChatSession]) -> Result<()> {
        if sessions.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).with_context(|| {
                    format!("Failed to remove history file: {}", self.path.display())
                })?;
            }
            return Ok(());
        }

        let json = serde_json::to_string(sessions).context("Failed to serialize chat history")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write history to {}", self.path.display()))?;
        Ok(())
    }

    /// Write the pretty-printed export artifact into `export_dir`, then clear
    /// the persisted entry. Returns the export path. The caller resets the
    /// in-memory collection afterwards.
    pub fn export_and_clear(
        &self,
        sessions: &[ChatSession],
        export_dir: &Path,
    ) -> Result<PathBuf> {
        let json =
            serde_json::to_string_pretty(sessions).context("Failed to serialize chat history")?;
        let export_path = export_dir.join(EXPORT_FILE_NAME);
        fs::write(&export_path, json)
            .with_context(|| format!("Failed to write export to {}", export_path.display()))?;
        self.save(&[])?;
        Ok(export_path)
    }
}
