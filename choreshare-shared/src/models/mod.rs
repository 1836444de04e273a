/// Data model for ChoreShare
///
/// This module contains the domain records shared by the engine, the
/// management services and the repositories.
///
/// # Models
///
/// - `user`: Users referenced by memberships and assignments
/// - `group`: Households that own members, roles and chores
/// - `role`: Permission bitmask and chore eligibility per role
/// - `membership`: User-group relationship and SuperRole aggregation
/// - `chore`: Chores and their current assignment
///
/// # Identity
///
/// Entities refer to each other by ID only. A chore knows its `group_id`,
/// an assignment knows its `chore_id` and `user_id`, and nothing holds a
/// pointer back to its owner. Lookups go through the repository.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod chore;
pub mod group;
pub mod membership;
pub mod role;
pub mod user;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }
    };
}

define_id!(
    /// Unique user ID
    UserId
);
define_id!(
    /// Unique group ID
    GroupId
);
define_id!(
    /// Unique role ID
    RoleId
);
define_id!(
    /// Unique chore ID
    ChoreId
);

pub use chore::{Chore, ChoreAssignment, ChoreListItem, ChoreUpdate, NewChore};
pub use group::{Group, NewGroup};
pub use membership::{Membership, SuperRole};
pub use role::{NewRole, Permission, Permissions, Role, RoleUpdate, RESERVED_ROLE_NAMES};
pub use user::User;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_by_inner_value() {
        let mut ids = vec![UserId(3), UserId(1), UserId(2)];
        ids.sort();
        assert_eq!(ids, vec![UserId(1), UserId(2), UserId(3)]);
    }

    #[test]
    fn test_id_display_and_serde_are_transparent() {
        assert_eq!(GroupId(42).to_string(), "42");
        assert_eq!(serde_json::to_string(&ChoreId(7)).unwrap(), "7");
        let parsed: RoleId = serde_json::from_str("9").unwrap();
        assert_eq!(parsed, RoleId(9));
    }
}
