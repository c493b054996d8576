//! Session lifecycle: bootstrap with a hard deadline, profile
//! resolution with fallbacks, and sign-in/sign-up/sign-out flows.
//!
//! Bootstrap never hangs the app: if the identity provider does not
//! answer within the configured timeout, loading clears and the user is
//! treated as signed out. Profile resolution always yields a usable
//! profile; only an unreachable store surfaces as an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use libsekolah_core::store::{from_row, to_row, Row};
use libsekolah_core::{
    IdentityProvider, Profile, Role, SekolahError, Session, SessionChange, Table,
};

use crate::api::Api;
use crate::stores::SessionStore;

pub struct AuthManager {
    identity: Arc<dyn IdentityProvider>,
    api: Api,
    sessions: Arc<SessionStore>,
    timeout: Duration,
    loading: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl AuthManager {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        api: Api,
        sessions: Arc<SessionStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            identity,
            api,
            sessions,
            timeout,
            loading: Arc::new(AtomicBool::new(true)),
            alive: Arc::new(AtomicBool::new(true)),
            listener: std::sync::Mutex::new(None),
        }
    }

    /// True until bootstrap has settled, one way or the other
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Restore the session on startup and start listening for
    /// session-change events. Always clears the loading flag.
    pub async fn bootstrap(&self) {
        match tokio::time::timeout(self.timeout, self.identity.current_session()).await {
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "session check timed out");
                self.sessions.clear();
            }
            Ok(Err(e)) => {
                error!(error = %e, "session check failed");
                self.sessions.clear();
            }
            Ok(Ok(None)) => {
                debug!("no active session");
                self.sessions.clear();
            }
            Ok(Ok(Some(session))) => {
                info!(email = %session.email, "session restored");
                self.sessions.set_session(session.clone());
                self.resolve_profile(&session).await;
            }
        }
        self.loading.store(false, Ordering::SeqCst);

        self.spawn_listener();
    }

    fn spawn_listener(&self) {
        let mut rx = self.identity.subscribe_session();
        let alive = self.alive.clone();
        let sessions = self.sessions.clone();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => {
                        if !alive.load(Ordering::SeqCst) {
                            break;
                        }
                        match change {
                            SessionChange::SignedIn(session) => {
                                debug!(email = %session.email, "session change: signed in");
                                sessions.set_session(session);
                            }
                            SessionChange::SignedOut => {
                                debug!("session change: signed out");
                                sessions.clear();
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session change stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = listener.replace(task) {
            old.abort();
        }
    }

    /// Stop reacting to session-change events
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = listener.take() {
            task.abort();
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Profile, SekolahError> {
        let session = match self.identity.sign_in(email, password).await {
            Ok(session) => session,
            Err(e) => {
                self.api.notices().error(format!("sign in failed: {}", e));
                return Err(e);
            }
        };
        self.sessions.set_session(session.clone());
        self.resolve_profile(&session).await;
        self.api.notices().success("signed in");

        self.sessions
            .profile()
            .ok_or_else(|| SekolahError::Internal("profile missing after sign in".to_string()))
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<Profile, SekolahError> {
        let session = match self.identity.sign_up(email, password, name, role).await {
            Ok(session) => session,
            Err(e) => {
                self.api.notices().error(format!("sign up failed: {}", e));
                return Err(e);
            }
        };
        self.sessions.set_session(session.clone());

        // Provision the profile row with the signup metadata
        let profile = self
            .provision_profile(&session, name.to_string(), role)
            .await;
        self.sessions.set_profile(profile.clone());
        self.api.notices().success("account created");
        Ok(profile)
    }

    pub async fn sign_out(&self) -> Result<(), SekolahError> {
        self.identity.sign_out().await?;
        self.sessions.clear();
        self.api.notices().success("signed out");
        Ok(())
    }

    /// Resolve the profile for a session and stash it in the session
    /// store. Falls back rather than failing: a signed-in user always
    /// ends up with some profile.
    async fn resolve_profile(&self, session: &Session) {
        match self.api.fetch_by_id(Table::Profiles, session.user_id).await {
            Ok(row) => match from_row::<Profile>(row) {
                Ok(profile) => {
                    debug!(role = %profile.role, "profile loaded");
                    self.sessions.set_profile(profile);
                }
                Err(e) => {
                    warn!(error = %e, "profile row malformed, using fallback");
                    self.sessions.set_profile(fallback_profile(session));
                }
            },
            Err(e) if e.is_not_found() => {
                // First login for this account
                let profile = self
                    .provision_profile(session, default_name(&session.email), Role::Admin)
                    .await;
                self.sessions.set_profile(profile);
            }
            Err(e) if e.is_undefined_table() => {
                warn!("profiles table missing, fabricating admin profile");
                self.sessions.set_profile(Profile {
                    id: session.user_id,
                    name: default_name(&session.email),
                    email: session.email.clone(),
                    role: Role::Admin,
                    created_at: None,
                });
            }
            Err(e) => {
                warn!(error = %e, "profile fetch failed, using fallback");
                self.sessions.set_profile(fallback_profile(session));
            }
        }
    }

    /// Create the profile row for a session; a fabricated profile is
    /// returned when the write fails so sign-in still completes.
    async fn provision_profile(&self, session: &Session, name: String, role: Role) -> Profile {
        let mut row = match profile_row(session, &name, role) {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "profile serialization failed, using fallback");
                return fallback_profile(session);
            }
        };
        row.insert("id".to_string(), json!(session.user_id.to_string()));

        match self.api.create(Table::Profiles, row).await {
            Ok(created) => from_row(created).unwrap_or_else(|e| {
                warn!(error = %e, "created profile row malformed, using fallback");
                fallback_profile(session)
            }),
            Err(e) => {
                warn!(error = %e, "profile creation failed, using fallback");
                fallback_profile(session)
            }
        }
    }
}

fn profile_row(session: &Session, name: &str, role: Role) -> Result<Row, SekolahError> {
    to_row(&json!({
        "name": name,
        "email": session.email,
        "role": role,
    }))
}

/// Local part of the email, or a generic label when it is empty
fn default_name(email: &str) -> String {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => "Administrator".to_string(),
    }
}

fn fallback_profile(session: &Session) -> Profile {
    Profile {
        id: session.user_id,
        name: "Administrator".to_string(),
        email: session.email.clone(),
        role: Role::Admin,
        created_at: None,
    }
}
