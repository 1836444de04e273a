/// User model
///
/// Users are owned by the account system, which is outside this crate. The
/// chore core only reads them: memberships resolve their user, and
/// assignments point at a user by ID.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(64) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// User referenced by memberships and chore assignments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: UserId,

    /// Display name, unique across all users
    pub username: String,

    /// When the user account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user record with the current timestamp
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        User {
            id,
            username: username.into(),
            created_at: Utc::now(),
        }
    }
}
