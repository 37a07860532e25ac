// API module - the completion-client boundary to the Generative Language API
pub mod client;
pub mod streaming;

// Re-export commonly used items
pub use client::{ApiError, ChatContext, GeminiClient};
pub use streaming::StreamEvent;
