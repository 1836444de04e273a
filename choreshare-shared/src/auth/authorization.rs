/// Authorization helpers and permission checks
///
/// This module gates group-mutating actions on the acting member's
/// SuperRole.
///
/// # Permission Model
///
/// ChoreShare uses a flat, per-group permission model:
///
/// 1. **Group Membership**: the actor must be a member of the group
/// 2. **Granular Permissions**: each action requires one specific
///    [`Permission`] bit on the actor's SuperRole
///
/// Every action is gated with [`require_permission`]. The coarse
/// `can_edit()` predicate never authorizes anything on its own.
///
/// | Action                              | Permission    |
/// |-------------------------------------|---------------|
/// | Add/remove members                  | `EditMembers` |
/// | Create/edit/delete chores           | `EditChores`  |
/// | Randomize/rotate assignments        | `EditChores`  |
/// | Rename the group                    | `EditGroup`   |
/// | Create/edit/delete/grant/revoke roles | `EditRoles` |

use crate::models::{GroupId, Membership, Permission, UserId};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Actor is not a member of the group
    #[error("Not a member of group {0}")]
    NotMember(GroupId),

    /// Actor's SuperRole lacks the required permission
    #[error("Insufficient permissions: requires {required}")]
    MissingPermission { required: Permission },
}

/// Finds the actor's membership among a group's loaded memberships
///
/// # Errors
///
/// Returns `AuthzError::NotMember` if the actor is not in `memberships`
pub fn require_membership(
    memberships: &[Membership],
    group_id: GroupId,
    actor: UserId,
) -> Result<&Membership, AuthzError> {
    memberships
        .iter()
        .find(|m| m.group_id == group_id && m.user_id() == actor)
        .ok_or(AuthzError::NotMember(group_id))
}

/// Checks that a member's SuperRole grants `required`
///
/// The SuperRole is rebuilt from the membership's roles on every call, so
/// callers must pass a membership whose roles were loaded for this request.
///
/// # Errors
///
/// Returns `AuthzError::MissingPermission` if the bit is not set
pub fn require_permission(
    membership: &Membership,
    required: Permission,
) -> Result<(), AuthzError> {
    if !membership.super_role().can(required) {
        return Err(AuthzError::MissingPermission { required });
    }

    Ok(())
}
