//!
//! Console command dispatch
//! ------------------------
//! Plays the role of the browser screens. Every protected command mounts a fresh
//! `AccessGuard`, so access is re-checked on each visit exactly as a screen mount would.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{teams_table, users_table};
use crate::error::{AppError, AppResult};
use crate::gateway::Gateway;
use crate::guard::{AccessGuard, GuardState};
use crate::identity::{Role, Route, SessionContext, SessionManager};
use crate::presenter::Presenter;
use crate::registry::{
    CreateForm, DeleteOutcome, EditSurface, EntityRegistry, TeamDraft, TeamRegistry, Teams, UserDraft, UserPatch,
    UserRegistry, Users,
};

pub const HELP: &str = "\
Commands:
  login <username> <password>        start a session
  logout                             end the session
  status                             show who is logged in
  users                              list users
  user add <username> <email> <password> [admin|user] [team_id]
  user edit <id> [username=..] [email=..] [role=..] [team=..]
  user delete <id>
  teams                              list teams
  team add <name> [description...]
  team delete <id>
  refresh                            refetch users and teams
  help                               show this help
  quit | exit                        leave the console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Text to show for the command.
    Print(String),
    /// Nothing more to show; any notices already went through the presenter.
    Quiet,
    Quit,
}

/// Forwards to the host presenter and remembers the last routing directive for the prompt.
struct Tracked {
    inner: Arc<dyn Presenter>,
    route: Mutex<Route>,
}

impl Presenter for Tracked {
    fn notify(&self, message: &str) {
        self.inner.notify(message);
    }

    fn navigate(&self, route: Route) {
        *self.route.lock() = route;
        self.inner.navigate(route);
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.inner.confirm(prompt)
    }
}

pub struct Console {
    gateway: Arc<dyn Gateway>,
    session: SessionManager,
    presenter: Arc<Tracked>,
    users: UserRegistry,
    teams: TeamRegistry,
}

impl Console {
    pub fn new(gateway: Arc<dyn Gateway>, context: SessionContext, presenter: Arc<dyn Presenter>) -> Self {
        let presenter = Arc::new(Tracked { inner: presenter, route: Mutex::new(Route::Login) });
        let dyn_presenter: Arc<dyn Presenter> = presenter.clone();
        Self {
            session: SessionManager::new(gateway.clone(), context),
            users: EntityRegistry::new(gateway.clone(), dyn_presenter.clone()),
            teams: EntityRegistry::new(gateway.clone(), dyn_presenter),
            gateway,
            presenter,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Screen the console is currently on.
    pub fn route(&self) -> Route {
        *self.presenter.route.lock()
    }

    /// Route to a restored session's landing screen, if a session was persisted.
    pub fn resume(&self) {
        if let Some(route) = self.session.resume() {
            self.presenter.navigate(route);
        }
    }

    pub fn prompt(&self) -> String {
        match self.session.context().current() {
            Some(s) => format!("teamgate {}@{}> ", s.user.username, self.route()),
            None => "teamgate> ".to_string(),
        }
    }

    pub async fn execute(&self, line: &str) -> AppResult<Flow> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((head, args)) = words.split_first() else {
            return Ok(Flow::Quiet);
        };
        debug!(target: "console", command = %head, "dispatch");
        match (head.to_ascii_lowercase().as_str(), args) {
            ("quit" | "exit", _) => Ok(Flow::Quit),
            ("help", _) => Ok(Flow::Print(HELP.to_string())),
            ("status", _) => Ok(Flow::Print(self.status())),
            ("login", [user, password]) => self.login(user, password).await,
            ("login", _) => Err(usage("login <username> <password>")),
            ("logout", _) => self.logout(),
            ("users", _) => self.show_users().await,
            ("teams", _) => self.show_teams().await,
            ("refresh", _) => self.refresh().await,
            ("user", [sub, rest @ ..]) => self.user_command(sub, rest).await,
            ("team", [sub, rest @ ..]) => self.team_command(sub, rest).await,
            ("user" | "team", []) => Err(usage(&format!("{} add|edit|delete ...", head))),
            (other, _) => Err(AppError::validation("unknown_command", format!("unknown command '{}'; try 'help'", other))),
        }
    }

    fn status(&self) -> String {
        match self.session.context().current() {
            Some(s) => format!("logged in as {} ({}) at {}", s.user.username, s.user.role, self.route()),
            None => "not logged in".to_string(),
        }
    }

    /// Start a session and move to its landing screen.
    pub async fn login(&self, user: &str, password: &str) -> AppResult<Flow> {
        let outcome = self.session.login(user, password).await?;
        self.users.teardown();
        self.teams.teardown();
        self.presenter.navigate(outcome.route);
        Ok(Flow::Print(format!("welcome, {}", outcome.session.user.username)))
    }

    fn logout(&self) -> AppResult<Flow> {
        self.session.logout()?;
        self.users.teardown();
        self.teams.teardown();
        self.presenter.navigate(Route::Login);
        Ok(Flow::Quiet)
    }

    /// Mount a guard for one protected screen visit.
    async fn admitted(&self) -> bool {
        let guard = AccessGuard::mount(self.gateway.clone(), self.session.context().clone(), self.presenter.clone());
        let state = guard.check().await;
        guard.teardown();
        if state != GuardState::Authorized && !self.session.context().is_authenticated() {
            self.users.teardown();
            self.teams.teardown();
        }
        state == GuardState::Authorized
    }

    async fn show_users(&self) -> AppResult<Flow> {
        if !self.admitted().await {
            return Ok(Flow::Quiet);
        }
        // Labels fall back to "Team {id}" when teams cannot be fetched.
        let _ = self.teams.list().await;
        let users = self.users.list().await?;
        Ok(Flow::Print(users_table(&users, &self.teams.items())))
    }

    async fn show_teams(&self) -> AppResult<Flow> {
        if !self.admitted().await {
            return Ok(Flow::Quiet);
        }
        let teams = self.teams.list().await?;
        Ok(Flow::Print(teams_table(&teams)))
    }

    async fn refresh(&self) -> AppResult<Flow> {
        if self.users.is_loading() || self.teams.is_loading() {
            return Ok(Flow::Print("a refresh is already in progress".to_string()));
        }
        self.show_users().await
    }

    async fn user_command(&self, sub: &str, args: &[&str]) -> AppResult<Flow> {
        if !self.admitted().await {
            return Ok(Flow::Quiet);
        }
        match (sub, args) {
            ("add", [username, email, password, extra @ ..]) => {
                if self.teams.items().is_empty() {
                    let _ = self.teams.list().await;
                }
                let teams = self.teams.items();
                let mut draft = UserDraft::for_teams(&teams);
                draft.username = username.to_string();
                draft.email = email.to_string();
                draft.password = password.to_string();
                if let Some(role) = extra.first() {
                    draft.role = parse_role(role)?;
                }
                if let Some(team) = extra.get(1) {
                    draft.team_id = parse_id(team)?;
                }
                let mut form = CreateForm::<Users>::new(draft);
                form.submit(&self.users, || UserDraft::for_teams(&teams)).await?;
                Ok(Flow::Print(users_table(&self.users.items(), &teams)))
            }
            ("add", _) => Err(usage("user add <username> <email> <password> [admin|user] [team_id]")),
            ("edit", [id, fields @ ..]) => {
                if self.users.items().is_empty() {
                    self.users.list().await?;
                }
                let Some(user) = self.users.items().into_iter().find(|u| u.id == *id) else {
                    return Err(AppError::validation("not_found", format!("no user with id {}", id)));
                };
                let mut edit = EditSurface::<Users>::new();
                edit.open(user.id.clone(), UserPatch::from(&user));
                if let Some(patch) = edit.patch_mut() {
                    for field in fields {
                        apply_field(patch, field)?;
                    }
                }
                edit.save(&self.users).await?;
                Ok(Flow::Print(users_table(&self.users.items(), &self.teams.items())))
            }
            ("edit", _) => Err(usage("user edit <id> [username=..] [email=..] [role=..] [team=..]")),
            ("delete", [id]) => match self.users.delete(&id.to_string()).await? {
                DeleteOutcome::Deleted => Ok(Flow::Print(users_table(&self.users.items(), &self.teams.items()))),
                DeleteOutcome::Declined => Ok(Flow::Print("cancelled".to_string())),
            },
            ("delete", _) => Err(usage("user delete <id>")),
            (other, _) => Err(AppError::validation("unknown_command", format!("unknown user command '{}'", other))),
        }
    }

    async fn team_command(&self, sub: &str, args: &[&str]) -> AppResult<Flow> {
        if !self.admitted().await {
            return Ok(Flow::Quiet);
        }
        match (sub, args) {
            ("add", [name, description @ ..]) => {
                let draft = TeamDraft { name: name.to_string(), description: description.join(" ") };
                let mut form = CreateForm::<Teams>::new(draft);
                form.submit(&self.teams, TeamDraft::default).await?;
                Ok(Flow::Print(teams_table(&self.teams.items())))
            }
            ("add", _) => Err(usage("team add <name> [description...]")),
            ("delete", [id]) => match self.teams.delete(&parse_id(id)?).await? {
                DeleteOutcome::Deleted => Ok(Flow::Print(teams_table(&self.teams.items()))),
                DeleteOutcome::Declined => Ok(Flow::Print("cancelled".to_string())),
            },
            ("delete", _) => Err(usage("team delete <id>")),
            (other, _) => Err(AppError::validation("unknown_command", format!("unknown team command '{}'", other))),
        }
    }
}

fn usage(text: &str) -> AppError {
    AppError::validation("usage", format!("usage: {}", text))
}

fn parse_role(raw: &str) -> AppResult<Role> {
    Role::parse(raw).ok_or_else(|| AppError::validation("invalid_role", format!("role must be admin or user, got '{}'", raw)))
}

fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>().map_err(|_| AppError::validation("invalid_id", format!("'{}' is not a team id", raw)))
}

fn apply_field(patch: &mut UserPatch, field: &str) -> AppResult<()> {
    let Some((key, value)) = field.split_once('=') else {
        return Err(AppError::validation("invalid_field", format!("expected key=value, got '{}'", field)));
    };
    match key {
        "username" => patch.username = value.to_string(),
        "email" => patch.email = value.to_string(),
        "role" => patch.role = parse_role(value)?,
        "team" | "team_id" => patch.team_id = parse_id(value)?,
        other => return Err(AppError::validation("invalid_field", format!("unknown field '{}'", other))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use serde_json::json;

    use crate::cli::TerminalPresenter;
    use crate::gateway::Method;
    use crate::guard::ACCESS_CHECK_PATH;
    use crate::identity::{MemorySessionStore, LOGIN_PATH};
    use crate::test_support::MockGateway;

    fn console_answering(gw: Arc<MockGateway>, answers: &'static str) -> Console {
        let ctx = SessionContext::init(Arc::new(MemorySessionStore::new()));
        Console::new(gw, ctx, Arc::new(TerminalPresenter::reading(Cursor::new(answers))))
    }

    fn console(gw: Arc<MockGateway>) -> Console {
        console_answering(gw, "")
    }

    fn admitted_gateway() -> Arc<MockGateway> {
        let gw = Arc::new(MockGateway::new());
        gw.respond(Method::GET, ACCESS_CHECK_PATH, 200, json!({"ok": true}));
        gw.respond(Method::DELETE, "/api/teams/3", 200, json!({"success": true}));
        gw.respond(Method::GET, "/api/teams", 200, json!([]));
        gw
    }

    #[tokio::test]
    async fn team_delete_waits_for_an_answer() {
        // no answer on the terminal
        let gw = admitted_gateway();
        let c = console_answering(gw.clone(), "");
        assert_eq!(c.execute("team delete 3").await.unwrap(), Flow::Print("cancelled".into()));
        assert_eq!(gw.call_count(Method::DELETE, "/api/teams/3"), 0);

        let gw = admitted_gateway();
        let c = console_answering(gw.clone(), "n\n");
        assert_eq!(c.execute("team delete 3").await.unwrap(), Flow::Print("cancelled".into()));
        assert_eq!(gw.call_count(Method::DELETE, "/api/teams/3"), 0);

        let gw = admitted_gateway();
        let c = console_answering(gw.clone(), "y\n");
        assert!(matches!(c.execute("team delete 3").await.unwrap(), Flow::Print(_)));
        assert_eq!(gw.call_count(Method::DELETE, "/api/teams/3"), 1);
    }

    #[test]
    fn edit_fields_apply_to_the_full_patch() {
        let mut patch = UserPatch { username: "a".into(), email: "a@x.io".into(), role: Role::User, team_id: 1 };
        apply_field(&mut patch, "role=admin").unwrap();
        apply_field(&mut patch, "team=4").unwrap();
        assert_eq!(patch.role, Role::Admin);
        assert_eq!(patch.team_id, 4);
        assert_eq!(apply_field(&mut patch, "color=red").unwrap_err().code_str(), "invalid_field");
        assert_eq!(apply_field(&mut patch, "team=x").unwrap_err().code_str(), "invalid_id");
    }

    #[tokio::test]
    async fn direct_login_keeps_the_password_whole() {
        let gw = Arc::new(MockGateway::new());
        gw.respond(Method::POST, LOGIN_PATH, 200, json!({"role": "admin", "data": {"id": 1, "username": "root"}}));
        let c = console(gw.clone());
        assert_eq!(c.login("root", "correct horse battery").await.unwrap(), Flow::Print("welcome, root".into()));
        assert_eq!(gw.calls()[0].body, Some(json!({"username": "root", "password": "correct horse battery"})));
        assert_eq!(c.route(), Route::AdminDashboard);
        assert_eq!(c.prompt(), "teamgate root@/dashboard> ");
    }

    #[tokio::test]
    async fn dispatch_basics() {
        let gw = Arc::new(MockGateway::new());
        let c = console(gw.clone());
        assert_eq!(c.execute("   ").await.unwrap(), Flow::Quiet);
        assert_eq!(c.execute("QUIT").await.unwrap(), Flow::Quit);
        assert_eq!(c.execute("status").await.unwrap(), Flow::Print("not logged in".into()));
        assert_eq!(c.execute("login onlyuser").await.unwrap_err().code_str(), "usage");
        assert_eq!(c.execute("frobnicate").await.unwrap_err().code_str(), "unknown_command");
        assert!(gw.calls().is_empty());
        assert_eq!(c.prompt(), "teamgate> ");
    }
}
