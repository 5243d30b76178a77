use super::*;
use std::fs;
use std::path::PathBuf;

impl App {
    pub(super) fn session_file_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".insight").join("session.json")
        } else {
            PathBuf::from(".insight").join("session.json")
        }
    }

    /// Restores theme and input history from the previous run. The
    /// transcript itself is per-conversation and never persisted.
    pub(super) fn restore_session(&mut self) {
        let path = Self::session_file_path();
        let Ok(raw) = fs::read_to_string(path) else {
            return;
        };
        let Ok(snapshot) = serde_json::from_str::<SessionSnapshot>(&raw) else {
            return;
        };

        self.theme = snapshot.theme;
        self.history = snapshot.history;
        self.history_pos = None;
    }

    pub(super) fn persist_session(&self) {
        const MAX_PERSISTED_HISTORY: usize = 400;

        let path = Self::session_file_path();
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }

        let history = if self.history.len() > MAX_PERSISTED_HISTORY {
            self.history[self.history.len().saturating_sub(MAX_PERSISTED_HISTORY)..].to_vec()
        } else {
            self.history.clone()
        };
        let snapshot = SessionSnapshot {
            theme: self.theme,
            history,
        };

        let Ok(serialized) = serde_json::to_string_pretty(&snapshot) else {
            return;
        };
        let _ = fs::write(path, serialized);
    }
}
