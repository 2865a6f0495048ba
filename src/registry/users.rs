use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::teams::{Team, DEFAULT_TEAM_ID};
use super::{Resource, Validate};
use crate::error::{AppError, AppResult, HttpError};
use crate::gateway::path_with_id;
use crate::identity::Role;
use crate::wire::{null_as_default, opt_int_or_string, string_or_number};

// Shape check only; the authority decides what addresses it accepts.
static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    /// Users without a team row come back with a null team and belong to the default team.
    #[serde(default, deserialize_with = "team_or_default")]
    pub team_id: i64,
    #[serde(default)]
    pub team_name: Option<String>,
}

fn team_or_default<'de, D: serde::Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    opt_int_or_string(d).map(|id| id.unwrap_or(DEFAULT_TEAM_ID))
}

/// Registration payload. The authority expects `teamId` here but `team_id` on update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(rename = "teamId")]
    pub team_id: i64,
}

impl UserDraft {
    /// Blank draft placed on the first cached team, or the default team when none are cached.
    pub fn for_teams(teams: &[Team]) -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            password: String::new(),
            role: Role::User,
            team_id: teams.first().map(|t| t.id).unwrap_or(DEFAULT_TEAM_ID),
        }
    }
}

impl Validate for UserDraft {
    fn validate(&self) -> AppResult<()> {
        check_identity(&self.username, &self.email)?;
        if self.password.is_empty() {
            return Err(AppError::validation("required", "Password is required"));
        }
        Ok(())
    }
}

/// Full replacement of the editable fields; never a partial diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPatch {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub team_id: i64,
}

impl From<&User> for UserPatch {
    fn from(u: &User) -> Self {
        Self { username: u.username.clone(), email: u.email.clone(), role: u.role, team_id: u.team_id }
    }
}

impl Validate for UserPatch {
    fn validate(&self) -> AppResult<()> {
        check_identity(&self.username, &self.email)
    }
}

fn check_identity(username: &str, email: &str) -> AppResult<()> {
    if username.trim().is_empty() {
        return Err(AppError::validation("required", "Username is required"));
    }
    if email.trim().is_empty() {
        return Err(AppError::validation("required", "Email is required"));
    }
    if !EMAIL.as_ref().map_or(true, |re| re.is_match(email.trim())) {
        return Err(AppError::validation("invalid_email", "Please enter a valid email address"));
    }
    Ok(())
}

/// Team label for a user row: the name the authority embedded, then the cached team, then a
/// synthetic `Team {id}`. The two caches are fetched independently and may disagree briefly.
pub fn team_label(user: &User, teams: &[Team]) -> String {
    if let Some(name) = user.team_name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    teams
        .iter()
        .find(|t| t.id == user.team_id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| format!("Team {}", user.team_id))
}

pub struct Users;

impl Resource for Users {
    type Item = User;
    type Id = String;
    type Draft = UserDraft;
    type Patch = UserPatch;

    const NOUN: &'static str = "user";
    const LIST_PATH: &'static str = "/api/auth/getAllUsers";
    const CREATE_PATH: &'static str = "/api/auth/register";
    const ENVELOPE_KEYS: &'static [&'static str] = &["users", "data", "result", "userList"];
    const DELETE_PROMPT: &'static str = "Are you sure you want to delete this user?";
    const CREATE_FAILED: &'static str = "Registration failed. Please try again.";
    const CREATE_SUCCEEDED: Option<&'static str> = Some("User registered successfully!");
    const UPDATE_FAILED: &'static str = "Failed to update user";
    const DELETE_FAILED: &'static str = "Failed to delete user";

    fn update_path(id: &String) -> Option<String> {
        Some(path_with_id("/api/auth/updateUser", id))
    }

    fn delete_path(id: &String) -> String {
        path_with_id("/api/users", id)
    }

    fn list_failure(err: &HttpError) -> String {
        match err.status_code {
            Some(status) => format!("API Error: {} - {}", status, err.message),
            None => "Network error occurred".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn team(id: i64, name: &str) -> Team {
        Team {
            id,
            name: name.into(),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            member_count: None,
        }
    }

    fn user(team_id: i64, team_name: Option<&str>) -> User {
        User {
            id: "1".into(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            role: Role::User,
            team_id,
            team_name: team_name.map(String::from),
        }
    }

    #[test]
    fn team_label_prefers_embedded_then_cache_then_synthetic() {
        let teams = vec![team(2, "Platform"), team(5, "Support")];
        assert_eq!(team_label(&user(5, Some("Support (renamed)")), &teams), "Support (renamed)");
        assert_eq!(team_label(&user(5, None), &teams), "Support");
        assert_eq!(team_label(&user(5, Some("")), &teams), "Support");
        assert_eq!(team_label(&user(9, None), &teams), "Team 9");
        assert_eq!(team_label(&user(9, None), &[]), "Team 9");
    }

    #[test]
    fn fresh_draft_targets_first_cached_team() {
        let d = UserDraft::for_teams(&[team(7, "Ops"), team(2, "Dev")]);
        assert_eq!(d.team_id, 7);
        assert_eq!(d.role, Role::User);
        assert_eq!(UserDraft::for_teams(&[]).team_id, 0);
    }

    #[test]
    fn draft_serializes_team_id_as_camel_case_and_patch_does_not() {
        let mut d = UserDraft::for_teams(&[]);
        d.username = "bo".into();
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["teamId"], json!(0));
        assert_eq!(v["role"], json!("user"));
        let p = UserPatch::from(&user(3, None));
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v, json!({"username": "ana", "email": "ana@example.com", "role": "user", "team_id": 3}));
    }

    #[test]
    fn validation_requires_every_field() {
        let mut d = UserDraft::for_teams(&[]);
        assert_eq!(d.validate().unwrap_err().message(), "Username is required");
        d.username = "bo".into();
        assert_eq!(d.validate().unwrap_err().message(), "Email is required");
        d.email = "not-an-email".into();
        assert_eq!(d.validate().unwrap_err().code_str(), "invalid_email");
        d.email = "bo@example.com".into();
        assert_eq!(d.validate().unwrap_err().message(), "Password is required");
        d.password = "pw".into();
        assert!(d.validate().is_ok());
    }

    #[test]
    fn decodes_numeric_ids_and_string_team_ids() {
        let u: User = serde_json::from_value(json!({
            "id": 42, "username": "cy", "email": "cy@x.io", "role": "admin", "team_id": "3"
        }))
        .unwrap();
        assert_eq!(u.id, "42");
        assert_eq!(u.team_id, 3);
        assert_eq!(u.role, Role::Admin);
        assert_eq!(u.team_name, None);
    }

    #[test]
    fn list_failure_messages() {
        let status = HttpError::status(502, "Bad Gateway", None);
        assert_eq!(Users::list_failure(&status), "API Error: 502 - Bad Gateway");
        assert_eq!(Users::list_failure(&HttpError::transport("refused")), "Network error occurred");
    }

    #[test]
    fn ids_are_percent_encoded_into_paths() {
        assert_eq!(Users::delete_path(&"a b".to_string()), "/api/users/a%20b");
        assert_eq!(Users::update_path(&"7".to_string()).as_deref(), Some("/api/auth/updateUser/7"));
    }
}
