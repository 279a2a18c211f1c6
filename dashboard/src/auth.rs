//! Authentication and session handling
//!
//! `AuthService` is the single owner of the current session. The session lives in memory, is
//! mirrored to the `SessionStorage` under the `currentSession` key, and is broadcast to the
//! subscribers of `current_role()`. A session with an expiration time is closed by a background
//! task exactly when it expires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub mod backend;
pub mod directory;
pub mod token;

pub use backend::{AuthBackend, Grant, MockBackend, RemoteBackend, TokenBackend};
pub use token::{SessionClaims, SessionToken, TokenIssuer};

use crate::model::role::Role;
use crate::model::users::User;
use crate::router::guard::SessionView;
use crate::state::{Subject, Subscription};
use crate::storage::{MemoryStorage, SessionStorage, StorageError};

/// Key of the persisted session
pub const SESSION_KEY: &str = "currentSession";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Session storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("Session token failure: {0}")]
    Token(#[from] token::Error),
    #[error("Malformed session data: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Authentication server failure: {0}")]
    Remote(String),
}

/// Authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<SessionToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Sessions without expiration time never expire
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl From<Grant> for Session {
    fn from(grant: Grant) -> Self {
        Self {
            user: grant.user,
            token: grant.token,
            expires_at: grant.expires_at,
        }
    }
}

/// Outcome of restoring the persisted session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// Nothing was persisted
    None,
    /// Session is active again
    Active(Role),
    /// Persisted session lapsed and was cleared
    Expired,
}

struct Inner {
    backend: Box<dyn AuthBackend>,
    storage: Box<dyn SessionStorage>,
    session: Subject<Option<Session>>,
    role: Subject<Option<Role>>,
    /// Raised when a session lapses, consumed by the login view
    expired: AtomicBool,
    /// Task closing the session on expiration
    expiry_watch: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the session state, cheap to clone
#[derive(Clone)]
pub struct AuthService(Arc<Inner>);

impl AuthService {
    pub fn new(
        backend: impl AuthBackend + 'static,
        storage: impl SessionStorage + 'static,
    ) -> Self {
        Self(Arc::new(Inner {
            backend: Box::new(backend),
            storage: Box::new(storage),
            session: Subject::new(None),
            role: Subject::new(None),
            expired: AtomicBool::new(false),
            expiry_watch: Mutex::new(None),
        }))
    }

    /// Service with the demo credentials and in-memory persistence
    pub fn mock() -> Self {
        Self::new(MockBackend, MemoryStorage::new())
    }

    /// Replaces the in-memory session notifying subscribers
    async fn publish(&self, session: Option<Session>) {
        let role = session.as_ref().map(Session::role);
        self.0.session.set(session).await;
        self.0.role.set(role).await;
    }

    /// Signs the user in returning their role
    ///
    /// On failure the current session, if any, is left untouched.
    #[instrument(skip(self, password), err)]
    pub async fn login(&self, username: &str, password: &str) -> Result<Role, AuthError> {
        let grant = self.0.backend.authenticate(username, password).await?;
        let session = Session::from(grant);
        let role = session.role();

        let persisted = serde_json::to_string(&session)?;
        self.0.storage.save(SESSION_KEY, &persisted).await?;

        self.0.expired.store(false, Ordering::SeqCst);
        self.publish(Some(session)).await;
        self.watch_expiry().await;

        info!(%role, "User logged in");
        Ok(role)
    }

    /// Signs the user out, clearing the memory and persisted session
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.cancel_expiry_watch().await;

        if let Some(token) = self.token().await
            && let Err(err) = self.0.backend.revoke(&token).await
        {
            warn!(%err, "Cannot revoke the session token");
        }

        self.clear().await?;
        info!("User logged out");
        Ok(())
    }

    /// Forced logout, the session is considered expired
    ///
    /// Failures of the persisted storage are logged, the in-memory session is always cleared.
    pub async fn expire(&self) {
        self.cancel_expiry_watch().await;
        self.close_expired().await;
    }

    async fn close_expired(&self) {
        self.0.expired.store(true, Ordering::SeqCst);
        if let Err(err) = self.clear().await {
            warn!(%err, "Cannot clear the persisted session");
        }
        info!("Session expired");
    }

    async fn clear(&self) -> Result<(), AuthError> {
        self.publish(None).await;
        self.0.storage.clear(SESSION_KEY).await?;
        Ok(())
    }

    /// Restores the persisted session on startup
    ///
    /// Lapsed sessions are cleared and reported, so the guards can send the user to the
    /// session-expired view. Unreadable sessions are dropped as if there were none.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<Restored, AuthError> {
        let Some(persisted) = self.0.storage.load(SESSION_KEY).await? else {
            return Ok(Restored::None);
        };

        let session: Session = match serde_json::from_str(&persisted) {
            Ok(session) => session,
            Err(err) => {
                warn!(%err, "Dropping unreadable persisted session");
                self.0.storage.clear(SESSION_KEY).await?;
                return Ok(Restored::None);
            }
        };

        if session.is_expired_at(Utc::now()) {
            self.0.storage.clear(SESSION_KEY).await?;
            self.0.expired.store(true, Ordering::SeqCst);
            info!("Persisted session expired");
            return Ok(Restored::Expired);
        }

        let role = session.role();
        self.publish(Some(session)).await;
        self.watch_expiry().await;

        debug!(%role, "Session restored");
        Ok(Restored::Active(role))
    }

    async fn cancel_expiry_watch(&self) {
        if let Some(watch) = self.0.expiry_watch.lock().await.take() {
            watch.abort();
        }
    }

    /// Arms the timer closing the current session when it expires
    ///
    /// Replaces any previously armed timer. Sessions without expiration are not watched.
    pub async fn watch_expiry(&self) {
        self.cancel_expiry_watch().await;

        let Some(expires_at) = self.0.session.with(|s| s.as_ref()?.expires_at).await else {
            return;
        };

        let delay = (expires_at - Utc::now()).to_std().unwrap_or_default();
        let service = Arc::downgrade(&self.0);
        let watch = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = service.upgrade() {
                let service = AuthService(inner);
                service.0.expiry_watch.lock().await.take();
                service.close_expired().await;
            }
        });

        *self.0.expiry_watch.lock().await = Some(watch);
    }

    pub async fn session(&self) -> Option<Session> {
        self.0.session.get().await
    }

    pub async fn role(&self) -> Option<Role> {
        self.0.role.get().await
    }

    /// Stream of the session role, `None` while signed out
    pub async fn current_role(&self) -> Subscription<Option<Role>> {
        self.0.role.subscribe().await
    }

    /// Stream of the whole session
    pub async fn current_session(&self) -> Subscription<Option<Session>> {
        self.0.session.subscribe().await
    }

    pub async fn current_user(&self) -> Option<User> {
        self.0
            .session
            .with(|session| session.as_ref().map(|session| session.user.clone()))
            .await
    }

    pub async fn token(&self) -> Option<SessionToken> {
        self.0
            .session
            .with(|session| session.as_ref()?.token.clone())
            .await
    }

    pub async fn is_authenticated(&self) -> bool {
        let now = Utc::now();
        self.0
            .session
            .with(|session| session.as_ref().is_some_and(|s| !s.is_expired_at(now)))
            .await
    }

    /// Returns whether the last session lapsed, clearing the flag
    pub fn take_session_expired(&self) -> bool {
        self.0.expired.swap(false, Ordering::SeqCst)
    }

    /// Snapshot of the session for the route guards
    ///
    /// A session which lapsed before its expiry timer fired is closed here as expired.
    pub async fn snapshot(&self) -> SessionView {
        let now = Utc::now();
        let lapsed = self
            .0
            .session
            .with(|session| session.as_ref().is_some_and(|s| s.is_expired_at(now)))
            .await;
        if lapsed {
            self.expire().await;
        }

        let role = self
            .0
            .session
            .with(|session| session.as_ref().map(Session::role))
            .await;

        SessionView {
            role,
            expired: self.0.expired.load(Ordering::SeqCst),
        }
    }
}
