//! # Interview Session State
//!
//! Holds the fixed, ordered interview question list and a cursor per session
//! pointing at the next question to ask. The original single process-global
//! cursor meant two browsers interleaved each other's interviews; here every
//! session token owns its own cursor inside one registry.
//!
//! ## Thread Safety:
//! The registry follows the same `Arc<RwLock<...>>` pattern as the rest of the
//! shared state. `advance()` takes the write lock for the whole read-increment
//! step, so two concurrent answers on the same session serialize and each
//! advances the cursor exactly once.
//!
//! Cursor invariant: always in `[0, questions.len())`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Registry of per-session interview cursors over one shared question list.
///
/// Questions are immutable after startup; cursors are created lazily the first
/// time a session token is seen and advance modulo the question count.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    questions: Arc<Vec<String>>,
    cursors: Arc<RwLock<HashMap<String, usize>>>,
}

impl SessionRegistry {
    /// Create a registry over the configured question list.
    ///
    /// The list must be non-empty; `AppConfig::validate` enforces that before
    /// this is ever constructed.
    pub fn new(questions: Vec<String>) -> Self {
        assert!(!questions.is_empty(), "question list cannot be empty");
        Self {
            questions: Arc::new(questions),
            cursors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Mint a fresh session token for clients that didn't send one.
    pub fn new_session_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// The question currently pointed at for this session, without advancing.
    ///
    /// Unknown tokens read as position 0 (a brand-new interview) but are not
    /// inserted; only a processed answer creates registry state.
    pub fn current_question(&self, token: &str) -> String {
        let cursors = self.cursors.read().unwrap();
        let index = cursors.get(token).copied().unwrap_or(0);
        self.questions[index].clone()
    }

    /// Return the question that *was* current for this session, then move the
    /// cursor forward with wraparound.
    pub fn advance(&self, token: &str) -> String {
        let mut cursors = self.cursors.write().unwrap();
        let entry = cursors.entry(token.to_string()).or_insert(0);
        let asked = self.questions[*entry].clone();
        *entry = (*entry + 1) % self.questions.len();
        asked
    }

    /// The question every new session starts with (for the landing page).
    pub fn first_question(&self) -> &str {
        &self.questions[0]
    }

    /// Number of sessions that have processed at least one answer.
    pub fn session_count(&self) -> usize {
        self.cursors.read().unwrap().len()
    }

    /// Number of questions in the fixed list.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}
