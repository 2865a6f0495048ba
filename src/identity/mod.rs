//! Session lifecycle for the console: login, persisted snapshot, routing decision, logout.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod store;
mod routing;
mod provider;

pub use principal::{Role, TeamRef, UserSummary};
pub use session::{Session, SessionContext};
pub use store::{SessionStore, MemorySessionStore, FileSessionStore};
pub use routing::{Route, route_for};
pub use provider::{SessionManager, LoginRequest, LoginOutcome, LOGIN_PATH, INVALID_CREDENTIALS};
