/// Group model
///
/// A group is a household. It owns its memberships, roles and chores through
/// their `group_id` columns; deleting a group cascades to all of them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE groups (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(64) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::GroupId;

/// Household that members share chores in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    /// Unique group ID
    pub id: GroupId,

    /// Display name
    pub name: String,

    /// When the group was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating or renaming a group
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewGroup {
    /// Group name (1-64 characters)
    #[validate(length(min = 1, max = 64, message = "Group name must be 1-64 characters"))]
    pub name: String,
}

impl NewGroup {
    pub fn new(name: impl Into<String>) -> Self {
        NewGroup { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_name_validation() {
        assert!(NewGroup::new("Flat 3B").validate().is_ok());
        assert!(NewGroup::new("").validate().is_err());
        assert!(NewGroup::new("x".repeat(65)).validate().is_err());
    }
}
