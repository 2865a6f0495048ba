use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::principal::{Role, TeamRef, UserSummary};
use super::routing::{route_for, Route};
use super::session::{Session, SessionContext};
use crate::error::{AppError, AppResult};
use crate::gateway::{Gateway, Method};
use crate::wire;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    role: Role,
    data: LoginData,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(deserialize_with = "wire::string_or_number")]
    id: String,
    username: String,
    #[serde(default)]
    teams: Option<Vec<TeamRef>>,
}

impl LoginBody {
    fn into_session(self) -> Session {
        Session {
            token: self.token.filter(|t| !t.is_empty()),
            user: UserSummary {
                id: self.data.id,
                username: self.data.username,
                role: self.role,
                teams: self.data.teams.unwrap_or_default(),
            },
        }
    }
}

/// Session established by a successful login plus where to go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub session: Session,
    pub route: Route,
}

/// Owns login, logout, and the post-login routing decision.
///
/// Concurrent logins are not deduplicated: callers disable re-submission while one is in
/// flight.
pub struct SessionManager {
    gateway: Arc<dyn Gateway>,
    context: SessionContext,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn Gateway>, context: SessionContext) -> Self {
        Self { gateway, context }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Exchange credentials for a session. On failure nothing is stored.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginOutcome> {
        let req = LoginRequest { username: username.to_string(), password: password.to_string() };
        let body = serde_json::to_value(&req).unwrap_or_else(|_| json!({}));
        let resp = match self.gateway.request(Method::POST, LOGIN_PATH, Some(body)).await {
            Ok(r) => r,
            Err(e) => {
                let message = e.body_field(&["message"]).unwrap_or(INVALID_CREDENTIALS).to_string();
                let code = if e.status_code.is_some() { "invalid_credentials" } else { "transport" };
                warn!(target: "session", user = %username, error = %e, "login rejected");
                return Err(AppError::auth(code, message));
            }
        };
        let parsed: LoginBody = serde_json::from_value(resp.body).map_err(|e| {
            AppError::shape("unexpected_login_payload", format!("Unexpected login response: {}", e))
        })?;
        let session = parsed.into_session();
        let route = route_for(&session.user);
        if let Err(e) = self.context.establish(session.clone()) {
            // The session is live in memory; only persistence across restarts is lost.
            warn!(target: "session", error = %e, "session not persisted");
        }
        info!(target: "session", user = %session.user.username, role = %session.user.role, route = %route, "login succeeded");
        Ok(LoginOutcome { session, route })
    }

    /// Routing directive for a session restored at start-up, if any.
    pub fn resume(&self) -> Option<Route> {
        self.context.current().map(|s| route_for(&s.user))
    }

    pub fn logout(&self) -> AppResult<()> {
        let who = self.context.current().map(|s| s.user.username);
        self.gateway.forget_session();
        self.context.teardown()?;
        info!(target: "session", user = ?who, "logged out");
        Ok(())
    }
}
