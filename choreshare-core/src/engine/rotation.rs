/// Chore rotation
///
/// Moves every assigned chore one step around a ring of members. The ring is
/// ordered by ascending user ID, and each member's chores pass to the next
/// member in that order, wrapping from the last back to the first. There is
/// no randomness: the same input always rotates the same way, and rotating
/// `N` times on a ring of `N` members restores every original assignee.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use choreshare_shared::models::{Chore, ChoreAssignment, UserId};

use super::error::EngineError;
use super::Reassignment;

/// Builds the successor map for a ring of members
fn successors(ring: &[UserId]) -> HashMap<UserId, UserId> {
    let mut sorted = ring.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    sorted
        .iter()
        .enumerate()
        .map(|(i, user)| (*user, sorted[(i + 1) % sorted.len()]))
        .collect()
}

/// Rotates each chore's assignment to the next member of `ring`
///
/// `ring` may be in any order. Every check runs before the first chore is
/// modified, so on error `chores` is unchanged.
///
/// # Errors
///
/// - `EngineError::EmptyRing` if `ring` is empty
/// - `EngineError::UnassignedChore` if a chore has no current assignment
/// - `EngineError::StaleAssignee` if a chore's assignee is not in `ring`
pub fn rotate(
    chores: &mut [Chore],
    ring: &[UserId],
    now: DateTime<Utc>,
    due_after: Option<Duration>,
) -> Result<Reassignment, EngineError> {
    if ring.is_empty() {
        return Err(EngineError::EmptyRing);
    }
    let next = successors(ring);

    let mut targets = Vec::with_capacity(chores.len());
    for chore in chores.iter() {
        let current = chore
            .assignee()
            .ok_or(EngineError::UnassignedChore(chore.id))?;
        let successor = next
            .get(&current)
            .copied()
            .ok_or(EngineError::StaleAssignee {
                chore: chore.id,
                user: current,
            })?;
        targets.push(successor);
    }

    let mut reassignment = Reassignment::default();
    for (chore, user_id) in chores.iter_mut().zip(targets) {
        let assignment = ChoreAssignment::new(chore.id, user_id, now, due_after);
        if let Some(previous) = chore.assignment.replace(assignment.clone()) {
            reassignment.old.push(previous);
        }
        reassignment.new.push(assignment);
    }

    Ok(reassignment)
}
