use super::principal::UserSummary;

/// Abstract navigation target; the host decides how to show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Home,
    AdminDashboard,
    TeamWorkspace(i64),
    Welcome,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Home => "/".to_string(),
            Route::AdminDashboard => "/dashboard".to_string(),
            Route::TeamWorkspace(id) => format!("/team/{}", id),
            Route::Welcome => "/welcome".to_string(),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Post-login routing: admins to the dashboard, members to their first team (authority order,
/// no re-sorting), everyone else to the welcome screen.
pub fn route_for(user: &UserSummary) -> Route {
    if user.is_admin() {
        return Route::AdminDashboard;
    }
    match user.teams.first() {
        Some(team) => Route::TeamWorkspace(team.id),
        None => Route::Welcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Role, TeamRef};

    fn user(role: Role, teams: &[i64]) -> UserSummary {
        UserSummary {
            id: "1".into(),
            username: "u".into(),
            role,
            teams: teams.iter().map(|id| TeamRef { id: *id, name: None }).collect(),
        }
    }

    #[test]
    fn admin_wins_over_teams() {
        assert_eq!(route_for(&user(Role::Admin, &[3])), Route::AdminDashboard);
    }

    #[test]
    fn first_team_in_authority_order() {
        assert_eq!(route_for(&user(Role::User, &[7, 2, 1])), Route::TeamWorkspace(7));
        assert_eq!(Route::TeamWorkspace(7).path(), "/team/7");
    }

    #[test]
    fn no_teams_goes_to_welcome() {
        assert_eq!(route_for(&user(Role::User, &[])), Route::Welcome);
    }
}
