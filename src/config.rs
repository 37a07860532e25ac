use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::models::DEFAULT_MODEL;

/// Base URL for the Generative Language API.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default directory for chat history and logs.
pub const DEFAULT_STORAGE_DIR: &str = "~/.arkcom";

/// Configuration for the Arkcom client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key; None degrades the client to a no-op (sending disabled).
    pub api_key: Option<String>,
    /// Base URL of the Generative Language API.
    pub api_url: String,
    /// Model used for new chats.
    pub default_model: String,
    /// Whether opened contexts attach the web-grounding tool.
    pub web_grounding: bool,
    /// Directory holding the history file and conversation logs.
    pub storage_dir: PathBuf,
    /// Verbose request/stream debugging output.
    pub verbose: bool,
}

impl ClientConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let storage_dir = cli
            .storage_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string());
        let storage_dir = expand_tilde(Path::new(&storage_dir))?;

        Ok(Self {
            api_key: env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
            api_url: cli
                .api_url
                .clone()
                .unwrap_or_else(|| GEMINI_API_URL.to_string()),
            default_model: cli
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            web_grounding: !cli.no_grounding,
            storage_dir,
            verbose: cli.verbose,
        })
    }
}

/// Expand ~ to home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(rest))
    } else if path_str == "~" {
        let home = env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home))
    } else {
        Ok(path.to_path_buf())
    }
}
