//! Dashboard users

use serde::{Deserialize, Serialize};

use crate::model::role::Role;

/// Newtype for user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u32);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Login name
    pub username: String,
    /// Display name
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn new(id: u32, username: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId(id),
            username: username.into(),
            name: name.into(),
            role,
        }
    }
}
