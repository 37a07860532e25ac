//! Arkcom Chat Library
//!
//! Session management, persistence, and the Gemini client boundary for the
//! `arkcom` terminal assistant.

pub mod api;
pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod logging;
pub mod models;

// Re-exports from local modules
pub use api::{ApiError, ChatContext, GeminiClient, StreamEvent};
pub use chat::sessions::{CreateOutcome, SessionList};
pub use chat::store::HistoryStore;
pub use chat::turn::{MessagePatch, Turn, TurnPhase};
pub use cli::Cli;
pub use config::ClientConfig;
pub use logging::ConversationLogger;
pub use models::{AttachedImage, ChatMessage, ChatSession, GroundingSource, Role, MAX_SESSIONS};
