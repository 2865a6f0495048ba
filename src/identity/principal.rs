use serde::{Deserialize, Serialize};

use crate::wire;

/// Role assigned by the authority. Anything other than `admin` is treated as a plain user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Team membership as reported at login; order is the authority's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    #[serde(deserialize_with = "wire::int_or_string")]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Minimal user snapshot kept with the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub teams: Vec<TeamRef>,
}

impl UserSummary {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_roles_fall_back_to_user() {
        let r: Role = serde_json::from_value(json!("admin")).unwrap();
        assert_eq!(r, Role::Admin);
        let r: Role = serde_json::from_value(json!("manager")).unwrap();
        assert_eq!(r, Role::User);
        assert_eq!(serde_json::to_value(Role::User).unwrap(), json!("user"));
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn summary_round_trips_through_storage_shape() {
        let s = UserSummary {
            id: "42".into(),
            username: "ana".into(),
            role: Role::Admin,
            teams: vec![TeamRef { id: 7, name: Some("ops".into()) }],
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["role"], json!("admin"));
        let back: UserSummary = serde_json::from_value(v).unwrap();
        assert_eq!(back, s);
    }
}
