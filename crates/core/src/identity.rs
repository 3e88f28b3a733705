//! Authenticated user profile

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform role carried by every account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Director,
    Administrator,
    DepartmentHead,
    Professor,
    Student,
    /// Any role string the client does not know about
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Every assignable role, in descending order of privilege
    pub const ALL: [Self; 5] = [
        Self::Director,
        Self::Administrator,
        Self::DepartmentHead,
        Self::Professor,
        Self::Student,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Director => "director",
            Self::Administrator => "administrator",
            Self::DepartmentHead => "department_head",
            Self::Professor => "professor",
            Self::Student => "student",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// Profile returned by `GET /auth/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    #[serde(rename = "nom_complet")]
    pub display_name: String,
    pub role: Role,
    #[serde(rename = "prenom", default)]
    pub first_name: Option<String>,
    #[serde(rename = "nom", default)]
    pub last_name: Option<String>,
}

impl Identity {
    /// Whether this identity holds one of `roles`
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}
