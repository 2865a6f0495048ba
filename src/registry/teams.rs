use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Resource, Validate};
use crate::error::{AppError, AppResult, HttpError};
use crate::gateway::path_with_id;
use crate::wire::{int_or_string, opt_int_or_string};

/// Members of a deleted team are moved here by the authority; it can never be deleted.
pub const DEFAULT_TEAM_ID: i64 = 0;

const TEAMS_PATH: &str = "/api/teams";
const NO_DESCRIPTION: &str = "No description";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(deserialize_with = "int_or_string")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Aggregated by the authority; arrives as a number or a numeric string.
    #[serde(default, deserialize_with = "opt_int_or_string")]
    pub member_count: Option<i64>,
}

impl Team {
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_TEAM_ID
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().filter(|d| !d.is_empty()).unwrap_or(NO_DESCRIPTION)
    }

    pub fn created_on(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamDraft {
    pub name: String,
    pub description: String,
}

impl Validate for TeamDraft {
    fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("required", "Team name is required"));
        }
        Ok(())
    }
}

/// Teams cannot be edited, so the patch type never reaches the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoPatch;

impl Validate for NoPatch {
    fn validate(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct Teams;

impl Resource for Teams {
    type Item = Team;
    type Id = i64;
    type Draft = TeamDraft;
    type Patch = NoPatch;

    const NOUN: &'static str = "team";
    const LIST_PATH: &'static str = TEAMS_PATH;
    const CREATE_PATH: &'static str = TEAMS_PATH;
    const ENVELOPE_KEYS: &'static [&'static str] = &["data", "teams", "result"];
    const DELETE_PROMPT: &'static str =
        "Are you sure you want to delete this team? Members will be moved to the default team.";
    const CREATE_FAILED: &'static str = "Failed to create team";
    const UPDATE_FAILED: &'static str = "Failed to update team";
    const DELETE_FAILED: &'static str = "Failed to delete team";

    fn update_path(_id: &i64) -> Option<String> {
        None
    }

    fn delete_path(id: &i64) -> String {
        path_with_id(TEAMS_PATH, &id.to_string())
    }

    fn delete_refusal(id: &i64) -> Option<&'static str> {
        (*id == DEFAULT_TEAM_ID).then_some("Cannot delete admin team")
    }

    fn list_failure(_err: &HttpError) -> String {
        "Failed to fetch teams".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_string_member_count_and_missing_description() {
        let t: Team = serde_json::from_value(json!({
            "id": "4",
            "name": "Ops",
            "created_at": "2024-03-09T10:00:00Z",
            "member_count": "12"
        }))
        .unwrap();
        assert_eq!(t.id, 4);
        assert_eq!(t.member_count, Some(12));
        assert_eq!(t.description_or_default(), "No description");
        assert_eq!(t.created_on(), "2024-03-09");
        assert!(!t.is_default());
    }

    #[test]
    fn blank_name_is_rejected() {
        let draft = TeamDraft { name: "   ".into(), description: "x".into() };
        assert_eq!(draft.validate().unwrap_err().code_str(), "required");
        assert!(TeamDraft { name: "Ops".into(), description: String::new() }.validate().is_ok());
    }

    #[test]
    fn default_team_is_refused_and_others_are_not() {
        assert_eq!(Teams::delete_refusal(&0), Some("Cannot delete admin team"));
        assert_eq!(Teams::delete_refusal(&3), None);
        assert_eq!(Teams::delete_path(&3), "/api/teams/3");
        assert_eq!(Teams::update_path(&3), None);
    }
}
