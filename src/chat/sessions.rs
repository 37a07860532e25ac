use colored::Colorize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::chat::store::HistoryStore;
use crate::models::{ChatMessage, ChatSession, GroundingSource, Role, MAX_SESSIONS};

/// Result of attempting to create a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Uuid),
    /// The collection is at the session ceiling; nothing was inserted. The
    /// only way forward is export-and-clear or delete-all.
    LimitReached,
}

/// The in-memory session collection and active-session pointer.
///
/// Ordering is newest-created-first. Every mutation rewrites the full
/// collection through the store, which is read once at startup.
pub struct SessionList {
    sessions: Vec<ChatSession>,
    active_id: Option<Uuid>,
    selected_model: String,
    store: HistoryStore,
}

impl SessionList {
    /// Load the stored collection, activating its head. An empty (or
    /// unreadable) store yields a single fresh session instead.
    pub fn load(store: HistoryStore, default_model: &str) -> Self {
        let sessions = store.load();
        let mut list = Self {
            sessions,
            active_id: None,
            selected_model: default_model.to_string(),
            store,
        };
        match list.sessions.first() {
            Some(head) => list.active_id = Some(head.id),
            None => {
                let _ = list.create_session();
            }
        }
        list
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn at_capacity(&self) -> bool {
        self.sessions.len() >= MAX_SESSIONS
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.active_id
    }

    pub fn active(&self) -> Option<&ChatSession> {
        let id = self.active_id?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Model used for sessions created from here on.
    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    /// Prepend a new empty session and activate it. At the ceiling nothing
    /// is inserted and the capacity signal is returned instead.
    pub fn create_session(&mut self) -> CreateOutcome {
        if self.at_capacity() {
            return CreateOutcome::LimitReached;
        }
        let session = ChatSession::new(&self.selected_model);
        let id = session.id;
        self.sessions.insert(0, session);
        self.active_id = Some(id);
        self.sync();
        CreateOutcome::Created(id)
    }

    /// Move the active pointer. Unknown ids are a no-op.
    pub fn select_session(&mut self, id: Uuid) {
        if self.sessions.iter().any(|s| s.id == id) {
            self.active_id = Some(id);
        }
    }

    /// Remove a session. Deleting the active session activates the new head;
    /// deleting the last session synthesizes a fresh replacement in the same
    /// step, so the collection is never left empty.
    pub fn delete_session(&mut self, id: Uuid) {
        self.sessions.retain(|s| s.id != id);
        if self.active_id == Some(id) {
            match self.sessions.first() {
                Some(head) => self.active_id = Some(head.id),
                None => {
                    let session = ChatSession::new(&self.selected_model);
                    self.active_id = Some(session.id);
                    self.sessions.push(session);
                }
            }
        }
        self.sync();
    }

    /// Append a user message and the in-progress model placeholder to the
    /// active session. No-op when nothing is active.
    pub fn append_turn(&mut self, user: ChatMessage, placeholder: ChatMessage) {
        let Some(session) = self.active_session_mut() else {
            return;
        };
        session.messages.push(user);
        session.messages.push(placeholder);
        self.sync();
    }

    /// Overwrite the in-progress model message with the cumulative text so
    /// far, and the citation set when supplied (last write wins). If the tail
    /// is not a model message a new one is appended instead.
    pub fn patch_streaming_message(&mut self, content: &str, sources: Option<&[GroundingSource]>) {
        let Some(session) = self.active_session_mut() else {
            return;
        };
        match session.messages.last_mut() {
            Some(last) if last.role == Role::Model => {
                last.content = content.to_string();
                if let Some(sources) = sources {
                    last.sources = Some(sources.to_vec());
                }
            }
            _ => {
                session.messages.push(ChatMessage {
                    role: Role::Model,
                    content: content.to_string(),
                    image: None,
                    sources: sources.map(|s| s.to_vec()),
                });
            }
        }
        self.sync();
    }

    /// Update one session's model and the default for future sessions.
    pub fn set_session_model(&mut self, id: Uuid, model: &str) {
        self.selected_model = model.to_string();
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
            session.model = model.to_string();
        }
        self.sync();
    }

    /// Delete-all policy path: drop every session, remove the stored entry,
    /// and start over with one fresh session.
    pub fn clear_all(&mut self) {
        self.sessions.clear();
        self.active_id = None;
        self.sync();
        let _ = self.create_session();
    }

    /// Export-then-clear policy path: write the export artifact, clear the
    /// persisted entry, and start over with one fresh session.
    pub fn export_and_clear(&mut self, export_dir: &Path) -> anyhow::Result<PathBuf> {
        let export_path = self.store.export_and_clear(&self.sessions, export_dir)?;
        self.sessions.clear();
        self.active_id = None;
        let _ = self.create_session();
        Ok(export_path)
    }

    fn active_session_mut(&mut self) -> Option<&mut ChatSession> {
        let id = self.active_id?;
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Full persistence sync, triggered by every mutation. A failed write is
    /// reported and the in-memory state stays authoritative.
    fn sync(&self) {
        if let Err(e) = self.store.save(&self.sessions) {
            eprintln!("{} Failed to persist chat history: {:#}", "⚠️".yellow(), e);
        }
    }
}
