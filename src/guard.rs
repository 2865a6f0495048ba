//! Access guard for protected screens.
//!
//! One guard per mount. It starts in `Checking`, asks the authority whether the current
//! session may view the screen, and settles once:
//!
//! - 2xx: `Authorized`, children render.
//! - 401: session dropped, navigate to login, `Unauthorized`.
//! - 403: show the authority's message, then navigate home, `Unauthorized`.
//! - anything else: `Unauthorized` with no navigation (fail closed, stay put).
//!
//! Nothing is cached across mounts; a new screen visit builds a new guard and checks again.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::gateway::{Gateway, Method};
use crate::identity::{Route, SessionContext};
use crate::presenter::Presenter;
use crate::scope::ViewScope;

pub const ACCESS_CHECK_PATH: &str = "/api/protected/validate-dashboard-access";
const FORBIDDEN_FALLBACK: &str = "Access denied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Authorized,
    Unauthorized,
}

impl GuardState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, GuardState::Checking)
    }
}

pub struct AccessGuard {
    gateway: Arc<dyn Gateway>,
    session: SessionContext,
    presenter: Arc<dyn Presenter>,
    state: Mutex<GuardState>,
    scope: ViewScope,
}

impl AccessGuard {
    pub fn mount(gateway: Arc<dyn Gateway>, session: SessionContext, presenter: Arc<dyn Presenter>) -> Self {
        Self { gateway, session, presenter, state: Mutex::new(GuardState::Checking), scope: ViewScope::new() }
    }

    pub fn state(&self) -> GuardState {
        *self.state.lock()
    }

    /// Run the capability check. A guard settles once; later calls return the settled state
    /// without another request. A response landing after `teardown` changes nothing.
    pub async fn check(&self) -> GuardState {
        let current = self.state();
        if current.is_settled() {
            return current;
        }
        let ticket = self.scope.ticket();
        let result = self.gateway.request(Method::GET, ACCESS_CHECK_PATH, None).await;
        if !ticket.is_current() {
            debug!(target: "guard", "discarding access check that landed after teardown");
            return self.state();
        }
        let next = match result {
            Ok(_) => {
                debug!(target: "guard", "access granted");
                GuardState::Authorized
            }
            Err(e) if e.is_unauthenticated() => {
                info!(target: "guard", "no valid session; redirecting to login");
                self.session.invalidate();
                self.gateway.forget_session();
                self.presenter.navigate(Route::Login);
                GuardState::Unauthorized
            }
            Err(e) if e.is_forbidden() => {
                let message = e.body_field(&["error", "message"]).unwrap_or(FORBIDDEN_FALLBACK).to_string();
                info!(target: "guard", %message, "access forbidden; redirecting home");
                self.presenter.notify(&message);
                self.presenter.navigate(Route::Home);
                GuardState::Unauthorized
            }
            Err(e) => {
                warn!(target: "guard", error = %e, "access check failed; staying closed");
                GuardState::Unauthorized
            }
        };
        *self.state.lock() = next;
        next
    }

    /// Check, then run `children` exactly once if authorized. Returns `None` otherwise.
    pub async fn render<R, F: FnOnce() -> R>(&self, children: F) -> Option<R> {
        match self.check().await {
            GuardState::Authorized => Some(children()),
            _ => None,
        }
    }

    pub fn teardown(&self) {
        self.scope.teardown();
    }
}
