//! Persisted session state: the signed-in user's session and resolved
//! profile. A corrupt or missing state file is treated as signed out.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use libsekolah_core::{Profile, Session};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

pub struct SessionStore {
    path: PathBuf,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Load persisted state from `path`. Unreadable or corrupt content
    /// is logged and discarded rather than failing startup.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = read_state(&path).unwrap_or_default();
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    pub fn state(&self) -> SessionState {
        self.read().clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read().profile.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.read().session.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.read().session.is_some()
    }

    pub fn set_session(&self, session: Session) {
        self.write().session = Some(session);
        self.persist();
    }

    pub fn set_profile(&self, profile: Profile) {
        self.write().profile = Some(profile);
        self.persist();
    }

    /// Drop session and profile and delete the state file
    pub fn clear(&self) {
        *self.write() = SessionState::default();
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove session file");
            }
        }
    }

    fn persist(&self) {
        let state = self.read().clone();
        if let Err(e) = write_state(&self.path, &state) {
            warn!(path = %self.path.display(), error = %e, "failed to persist session state");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn read_state(path: &Path) -> Option<SessionState> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read session file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt session file, starting signed out");
            None
        }
    }
}

fn write_state(path: &Path, state: &SessionState) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(path, content)
}
