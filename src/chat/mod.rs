// Chat module - session collection, persistence, and the streaming turn reducer
pub mod sessions;
pub mod store;
pub mod turn;

// Re-export commonly used items
pub use sessions::{CreateOutcome, SessionList};
pub use store::HistoryStore;
pub use turn::{MessagePatch, Turn, TurnPhase};
