//! Persisted UI preferences: sidebar visibility and the last page the
//! user was on.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

fn default_sidebar_open() -> bool {
    true
}

fn default_page() -> String {
    "dashboard".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiState {
    #[serde(default = "default_sidebar_open")]
    pub sidebar_open: bool,
    #[serde(default = "default_page")]
    pub current_page: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            sidebar_open: default_sidebar_open(),
            current_page: default_page(),
        }
    }
}

pub struct UiStore {
    path: PathBuf,
    state: RwLock<UiState>,
}

impl UiStore {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = read_state(&path).unwrap_or_default();
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    pub fn state(&self) -> UiState {
        self.read().clone()
    }

    pub fn sidebar_open(&self) -> bool {
        self.read().sidebar_open
    }

    pub fn current_page(&self) -> String {
        self.read().current_page.clone()
    }

    pub fn toggle_sidebar(&self) {
        {
            let mut state = self.write();
            state.sidebar_open = !state.sidebar_open;
        }
        self.persist();
    }

    pub fn set_sidebar_open(&self, open: bool) {
        self.write().sidebar_open = open;
        self.persist();
    }

    pub fn set_current_page(&self, page: impl Into<String>) {
        self.write().current_page = page.into();
        self.persist();
    }

    fn persist(&self) {
        let state = self.read().clone();
        if let Err(e) = write_state(&self.path, &state) {
            warn!(path = %self.path.display(), error = %e, "failed to persist ui state");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, UiState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, UiState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn read_state(path: &Path) -> Option<UiState> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read ui state file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt ui state file, using defaults");
            None
        }
    }
}

fn write_state(path: &Path, state: &UiState) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(path, content)
}
