/// Membership model and SuperRole aggregation
///
/// A membership relates one user to one group. It carries the roles the
/// user holds in that group and the chores currently assigned to them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE memberships (
///     group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (group_id, user_id)
/// );
///
/// CREATE TABLE role_assignments (
///     role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     PRIMARY KEY (role_id, user_id)
/// );
/// ```
///
/// # SuperRole
///
/// A member's effective capabilities are the union of every role they hold:
/// permissions are OR-ed bit by bit and `gets_chores` is true if any role
/// grants it. The SuperRole is never stored. [`Membership::super_role`]
/// rebuilds it from whatever roles are loaded right now, so a role change is
/// visible as soon as the roles are reloaded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chore::ChoreAssignment;
use super::role::{Permission, Permissions, Role, OWNER_ROLE};
use super::user::User;
use super::{GroupId, UserId};

/// Effective capabilities of a member, aggregated from all of their roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperRole {
    /// Bitwise OR of every role's permissions
    pub permissions: Permissions,

    /// Logical OR of every role's `gets_chores`
    pub gets_chores: bool,
}

impl SuperRole {
    /// Aggregates a member's roles
    pub fn from_roles(roles: &[Role]) -> Self {
        roles.iter().fold(SuperRole::default(), |acc, role| SuperRole {
            permissions: acc.permissions | role.permissions,
            gets_chores: acc.gets_chores || role.gets_chores,
        })
    }

    /// Tests one capability
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.can(permission)
    }

    /// See [`Permissions::can_edit`]
    pub fn can_edit(&self) -> bool {
        self.permissions.can_edit()
    }
}

/// Membership of a user in a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Group the user belongs to
    pub group_id: GroupId,

    /// Resolved user
    pub user: User,

    /// When the user joined the group
    pub joined_at: DateTime<Utc>,

    /// Roles held in this group, as last loaded
    pub roles: Vec<Role>,

    /// Chores currently assigned to this member in this group
    pub assignments: Vec<ChoreAssignment>,
}

impl Membership {
    /// Creates a membership without roles or assignments
    pub fn new(group_id: GroupId, user: User, joined_at: DateTime<Utc>) -> Self {
        Membership {
            group_id,
            user,
            joined_at,
            roles: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// ID of the member's user
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Builds the member's SuperRole from the currently loaded roles
    pub fn super_role(&self) -> SuperRole {
        SuperRole::from_roles(&self.roles)
    }

    /// True if any held role makes the member chore-eligible
    pub fn gets_chores(&self) -> bool {
        self.super_role().gets_chores
    }

    /// True if the member holds the group's Owner role
    pub fn is_owner(&self) -> bool {
        self.roles.iter().any(|role| role.name == OWNER_ROLE)
    }
}

/// Keeps only the members whose SuperRole grants chores
pub fn eligible_members(memberships: Vec<Membership>) -> Vec<Membership> {
    memberships.into_iter().filter(Membership::gets_chores).collect()
}
