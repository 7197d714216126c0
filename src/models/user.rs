// src/models/user.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Role carried by a user record and by the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the 'users' table in the database.
///
/// Credentials live with the external identity provider; this is the local
/// mirror that assignments hang off.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Only changed through the admin role update.
    pub role: Role,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for an admin registering a user record.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

/// DTO for the explicit admin role change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub role: Role,
}
