use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::principal::UserSummary;
use super::store::SessionStore;
use crate::error::AppResult;
use crate::tprintln;

/// Authenticated context established by login. Replaced wholesale on re-login, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token, when the authority issued one; the cookie jar carries the session otherwise.
    #[serde(default)]
    pub token: Option<String>,
    pub user: UserSummary,
}

struct ContextInner {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<Session>>,
}

/// Explicit session handle passed to every component that needs the credential.
///
/// Cloning shares the same underlying session. Only the session manager writes it (login and
/// logout); the access guard may invalidate it when the authority answers 401. Everyone else
/// reads.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

impl SessionContext {
    /// Start-of-app initialisation: restore whatever the store persisted.
    pub fn init(store: Arc<dyn SessionStore>) -> Self {
        let restored = match store.load() {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "session", error = %e, "ignoring unreadable persisted session");
                None
            }
        };
        if let Some(s) = &restored {
            debug!(target: "session", user = %s.user.username, "restored persisted session");
        }
        Self { inner: Arc::new(ContextInner { store, current: RwLock::new(restored) }) }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.current.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.current.read().as_ref().and_then(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.current.read().is_some()
    }

    /// Replace the session and persist it. The in-memory session is kept even when the
    /// store fails; the error is returned so the caller can report it.
    pub(crate) fn establish(&self, session: Session) -> AppResult<()> {
        tprintln!("session.establish user={}", session.user.username);
        let persisted = self.inner.store.save(&session);
        *self.inner.current.write() = Some(session);
        persisted
    }

    /// Drop the session after the authority rejected it (401).
    pub(crate) fn invalidate(&self) {
        *self.inner.current.write() = None;
        if let Err(e) = self.inner.store.clear() {
            warn!(target: "session", error = %e, "failed to clear persisted session");
        }
    }

    /// Logout: forget the session in memory and in storage.
    pub fn teardown(&self) -> AppResult<()> {
        *self.inner.current.write() = None;
        self.inner.store.clear()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let user = self.inner.current.read().as_ref().map(|s| s.user.username.clone());
        f.debug_struct("SessionContext").field("user", &user).finish()
    }
}
