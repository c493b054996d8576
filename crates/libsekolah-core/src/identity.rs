//! Identity provider boundary: sessions, credentials, and session-change
//! fan-out. The hosted auth service is represented by the trait; the
//! in-tree `MemoryIdentity` covers local mode and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::SekolahError;
use crate::types::{RecordId, Role};

/// Capacity of the session-change channel
const SESSION_CHANNEL_CAPACITY: usize = 16;

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: RecordId,
    pub email: String,
}

/// Emitted whenever the session state flips
#[derive(Debug, Clone)]
pub enum SessionChange {
    SignedIn(Session),
    SignedOut,
}

/// The identity provider boundary
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SekolahError>;

    /// Register a new account and sign it in. `name` and `role` are
    /// carried as signup metadata; the caller provisions the matching
    /// profile row.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<Session, SekolahError>;

    async fn sign_out(&self) -> Result<(), SekolahError>;

    async fn current_session(&self) -> Result<Option<Session>, SekolahError>;

    /// Subscribe to session-change events
    fn subscribe_session(&self) -> broadcast::Receiver<SessionChange>;
}

struct RegisteredUser {
    user_id: RecordId,
    password: String,
    name: String,
    role: Role,
}

/// In-memory identity provider. Passwords are compared in plain text;
/// this is a test/local double, not an auth service.
pub struct MemoryIdentity {
    users: RwLock<HashMap<String, RegisteredUser>>,
    current: RwLock<Option<Session>>,
    changes: broadcast::Sender<SessionChange>,
    /// Delay applied to `current_session`, for exercising the bootstrap
    /// timeout
    session_delay_ms: AtomicU64,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            changes: broadcast::channel(SESSION_CHANNEL_CAPACITY).0,
            session_delay_ms: AtomicU64::new(0),
        }
    }

    /// Seed an account without signing it in
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<RecordId, SekolahError> {
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(SekolahError::Conflict(format!(
                "email already registered: {}",
                email
            )));
        }
        let user_id = RecordId::generate();
        users.insert(
            email.to_string(),
            RegisteredUser {
                user_id,
                password: password.to_string(),
                name: name.to_string(),
                role,
            },
        );
        Ok(user_id)
    }

    /// Signup metadata for a registered account, as (name, role)
    pub async fn signup_metadata(&self, email: &str) -> Option<(String, Role)> {
        self.users
            .read()
            .await
            .get(email)
            .map(|u| (u.name.clone(), u.role))
    }

    /// Make `current_session` stall for `delay` before answering
    pub fn set_session_delay(&self, delay: Duration) {
        self.session_delay_ms
            .store(delay.as_millis() as u64, AtomicOrdering::SeqCst);
    }

    fn emit(&self, change: SessionChange) {
        let _ = self.changes.send(change);
    }

    fn new_session(user_id: RecordId, email: &str) -> Session {
        Session {
            access_token: Uuid::new_v4().to_string(),
            user_id,
            email: email.to_string(),
        }
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SekolahError> {
        let users = self.users.read().await;
        let user = users
            .get(email)
            .filter(|u| u.password == password)
            .ok_or_else(|| SekolahError::Auth("invalid email or password".to_string()))?;
        let session = Self::new_session(user.user_id, email);
        drop(users);

        *self.current.write().await = Some(session.clone());
        debug!(email = %email, "signed in");
        self.emit(SessionChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<Session, SekolahError> {
        let user_id = self.register(email, password, name, role).await?;
        let session = Self::new_session(user_id, email);

        *self.current.write().await = Some(session.clone());
        debug!(email = %email, "signed up");
        self.emit(SessionChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), SekolahError> {
        *self.current.write().await = None;
        debug!("signed out");
        self.emit(SessionChange::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, SekolahError> {
        let delay = self.session_delay_ms.load(AtomicOrdering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(self.current.read().await.clone())
    }

    fn subscribe_session(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}
