//! Per-file saved queries and query history. Process lifetime only; never written to disk.

use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::utils::config::HISTORY_LIMIT;
use crate::{HistoryEntry, SavedQuery};

#[derive(Debug)]
pub struct SessionState {
    saved_queries: Vec<SavedQuery>,
    history: Vec<HistoryEntry>,
    history_limit: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::with_history_limit(HISTORY_LIMIT)
    }
}

impl SessionState {
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            saved_queries: Vec::new(),
            history: Vec::new(),
            history_limit,
        }
    }

    /// Save `sql` under `name`, replacing any query already saved with that name.
    pub fn save_query(&mut self, name: &str, sql: &str) -> &SavedQuery {
        self.saved_queries.retain(|q| q.name != name);
        self.saved_queries.push(SavedQuery {
            name: name.to_string(),
            sql: sql.to_string(),
            created_at: Utc::now().timestamp_millis(),
        });
        &self.saved_queries[self.saved_queries.len() - 1]
    }

    pub fn saved_queries(&self) -> &[SavedQuery] {
        &self.saved_queries
    }

    /// Remove the query named `name`. Returns whether one existed.
    pub fn delete_saved_query(&mut self, name: &str) -> bool {
        let before = self.saved_queries.len();
        self.saved_queries.retain(|q| q.name != name);
        self.saved_queries.len() != before
    }

    /// Record an executed statement at the front of the history, dropping the oldest past the limit.
    pub fn record_history(&mut self, sql: &str, row_count: usize) -> &HistoryEntry {
        self.history.insert(
            0,
            HistoryEntry {
                id: uuid::Uuid::new_v4().simple().to_string(),
                sql: sql.to_string(),
                timestamp: Utc::now().timestamp_millis(),
                row_count,
                pinned: false,
            },
        );
        self.history.truncate(self.history_limit);
        &self.history[0]
    }

    /// Most recent first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Flip `pinned` on the entry with `id`. Returns the new state, or None if no such entry.
    pub fn toggle_pin(&mut self, id: &str) -> Option<bool> {
        let entry = self.history.iter_mut().find(|e| e.id == id)?;
        entry.pinned = !entry.pinned;
        Some(entry.pinned)
    }
}

/// Session state for every file opened in this process, keyed by path.
///
/// Owned by the orchestration layer and handed to the core per call.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<PathBuf, SessionState>,
    history_limit: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl SessionRegistry {
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            history_limit,
        }
    }

    /// State for `path`, created empty on first use. Survives close/reopen of the file.
    pub fn session_mut(&mut self, path: &Path) -> &mut SessionState {
        let limit = self.history_limit;
        self.sessions
            .entry(path.to_path_buf())
            .or_insert_with(|| SessionState::with_history_limit(limit))
    }

    pub fn get(&self, path: &Path) -> Option<&SessionState> {
        self.sessions.get(path)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
