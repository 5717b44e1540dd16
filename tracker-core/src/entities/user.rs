use serde::{Deserialize, Serialize};

use super::Identified;
use crate::value_objects::UserId;

const ADMIN_ROLE: &str = "ROLE_ADMIN";
const CLIENT_ROLE_MARKER: &str = "CLI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    /// Staff members operating the plant
    pub fn is_internal(&self) -> bool {
        self.roles.iter().any(|r| r.name == ADMIN_ROLE)
    }

    /// Customer accounts
    pub fn is_external(&self) -> bool {
        self.roles.iter().any(|r| r.name.contains(CLIENT_ROLE_MARKER))
    }
}

impl Identified for User {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

/// Create/update payload for users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub roles: Vec<String>,
}
