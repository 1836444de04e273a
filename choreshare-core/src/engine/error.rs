/// Engine error type
///
/// Every variant is an invariant violation: the group's data cannot be
/// distributed or rotated as it stands. The engine reports these before it
/// touches any chore.

use choreshare_shared::models::{ChoreId, UserId};
use thiserror::Error;

/// Errors raised by the distribution and rotation engines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No member of the group is chore-eligible
    #[error("No chore-eligible members to distribute to")]
    NoEligibleMembers,

    /// Rotation ring has no members
    #[error("Rotation ring is empty")]
    EmptyRing,

    /// A chore has no assignee where one is required
    #[error("Chore {0} has no assignee")]
    UnassignedChore(ChoreId),

    /// A chore's current assignee is not in the rotation ring
    #[error("Chore {chore} is assigned to user {user}, who is not in the rotation ring")]
    StaleAssignee { chore: ChoreId, user: UserId },
}
