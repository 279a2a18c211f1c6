//! User roles

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role {0:?}")]
pub struct UnknownRole(pub String);

/// Role of an authenticated user
///
/// The canonical textual form is lowercase (`intern`, `spoc`, `manager`), which is what gets
/// persisted and put into session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Intern,
    /// Single point of contact, supervising a group of interns
    Spoc,
    Manager,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Intern, Role::Spoc, Role::Manager];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Intern => "intern",
            Role::Spoc => "spoc",
            Role::Manager => "manager",
        }
    }

    /// Landing path of the role's dashboard
    pub fn dashboard(&self) -> &'static str {
        match self {
            Role::Intern => "/intern-dashboard",
            Role::Spoc => "/spoc-dashboard",
            Role::Manager => "/manager-dashboard",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    /// Parses the role ignoring case and surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = s.trim();
        Role::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(role))
            .ok_or_else(|| UnknownRole(s.to_owned()))
    }
}
