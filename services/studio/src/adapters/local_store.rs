//! services/studio/src/adapters/local_store.rs
//!
//! Local-only persisted state: default form settings, the sidebar-collapse
//! flag, and the anonymous-user history fallback. Implements the
//! `HistoryService` port from the core crate. These are UX conveniences,
//! not server-authoritative data; a missing or corrupt file behaves exactly
//! like a fresh session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use lesson_studio_core::domain::FormState;
use lesson_studio_core::ports::{HistoryEntry, HistoryService, PortError, PortResult};

/// The anonymous history keeps only the most recent items.
pub const MAX_HISTORY_ITEMS: usize = 10;

/// The persisted state, keyed under fixed string names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredState {
    #[serde(default, rename = "studio.defaultSettings")]
    pub default_settings: Option<FormState>,
    #[serde(default, rename = "studio.sidebarCollapsed")]
    pub sidebar_collapsed: bool,
    #[serde(default, rename = "studio.anonymousHistory")]
    pub history: Vec<HistoryEntry>,
}

/// A JSON-file-backed store for local client state.
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the stored state. A missing or unreadable file degrades to the
    /// default (fresh-session) state instead of erroring.
    pub fn load(&self) -> StoredState {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!("Corrupt local state file, starting fresh: {}", error);
                StoredState::default()
            }),
            Err(_) => StoredState::default(),
        }
    }

    fn save(&self, state: &StoredState) -> PortResult<()> {
        let raw = serde_json::to_string_pretty(state)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| PortError::Unexpected(e.to_string()))
    }

    pub fn set_default_settings(&self, form: &FormState) -> PortResult<()> {
        let mut state = self.load();
        state.default_settings = Some(form.clone());
        self.save(&state)
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) -> PortResult<()> {
        let mut state = self.load();
        state.sidebar_collapsed = collapsed;
        self.save(&state)
    }

    /// The most-recent-first anonymous history.
    pub fn recent_history(&self) -> Vec<HistoryEntry> {
        self.load().history
    }
}

#[async_trait]
impl HistoryService for LocalStore {
    async fn record(&self, entry: &HistoryEntry) -> PortResult<()> {
        let mut state = self.load();
        state.history.insert(0, entry.clone());
        state.history.truncate(MAX_HISTORY_ITEMS);
        self.save(&state)
    }
}
