/// Chore distribution (randomize)
///
/// Assigns every chore in a group to one of its chore-eligible members.
///
/// # Algorithm
///
/// 1. Shuffle the chores (Fisher–Yates, see [`shuffle`]).
/// 2. Compute each chore's weight (`duration_minutes / 5`) and the target
///    load `sum(weights) / members`, floored at 1.
/// 3. Walk the shuffled chores once with a round-robin member index. A chore
///    goes to the member under the index while that member's load is below
///    target; once the index has wrapped around, every chore is taken by the
///    member under the index. The index advances after every chore.
///
/// Each member is visited once with a load of zero before the first wrap, so
/// the pass deals chores out in turn. Balance for uniform-weight chores is
/// within one chore; mixed weights can end up lumpy.

use chrono::{DateTime, Duration, Utc};
use choreshare_shared::models::{Chore, ChoreAssignment, Membership};

use super::error::EngineError;
use super::random::{shuffle, RandomSource};
use super::Reassignment;

/// Distributes `chores` over `eligible`
///
/// The chores are reordered by the shuffle and each one's `assignment` is
/// replaced. Prior assignments are returned in [`Reassignment::old`].
///
/// # Errors
///
/// - `EngineError::NoEligibleMembers` if `eligible` is empty; no chore is
///   touched
/// - `EngineError::UnassignedChore` if a chore ends the pass without an
///   assignee; no chore is touched
pub fn randomize(
    chores: &mut [Chore],
    eligible: &[Membership],
    rng: &mut dyn RandomSource,
    now: DateTime<Utc>,
    due_after: Option<Duration>,
) -> Result<Reassignment, EngineError> {
    if eligible.is_empty() {
        return Err(EngineError::NoEligibleMembers);
    }

    shuffle(chores, rng);

    let picks = pick_members(chores, eligible.len());
    if let Some(position) = picks.iter().position(Option::is_none) {
        return Err(EngineError::UnassignedChore(chores[position].id));
    }

    let mut reassignment = Reassignment::default();
    for (chore, pick) in chores.iter_mut().zip(picks.into_iter().flatten()) {
        let assignment =
            ChoreAssignment::new(chore.id, eligible[pick].user_id(), now, due_after);
        if let Some(previous) = chore.assignment.replace(assignment.clone()) {
            reassignment.old.push(previous);
        }
        reassignment.new.push(assignment);
    }

    Ok(reassignment)
}

/// Greedy round-robin pass; returns the member index chosen per chore
fn pick_members(chores: &[Chore], member_count: usize) -> Vec<Option<usize>> {
    let total: u32 = chores.iter().map(Chore::weight).sum();
    let target = (total / member_count as u32).max(1);

    let mut loads = vec![0u32; member_count];
    let mut index = 0;
    let mut all_checked = false;

    chores
        .iter()
        .map(|chore| {
            if index >= member_count {
                index = 0;
                all_checked = true;
            }
            let pick = if loads[index] < target || all_checked {
                loads[index] += chore.weight();
                Some(index)
            } else {
                None
            };
            index += 1;
            pick
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::random::StdRandom;
    use choreshare_shared::models::{ChoreId, GroupId, User, UserId};
    use std::collections::HashMap;

    /// Never swaps: drawing `bound - 1` keeps every element in place
    struct Identity;

    impl RandomSource for Identity {
        fn next_below(&mut self, bound: usize) -> usize {
            bound - 1
        }
    }

    fn chore(id: i64, duration_minutes: i32) -> Chore {
        Chore {
            id: ChoreId(id),
            group_id: GroupId(1),
            name: format!("chore-{id}"),
            description: String::new(),
            duration_minutes,
            assignment: None,
        }
    }

    fn member(id: i64) -> Membership {
        Membership::new(GroupId(1), User::new(UserId(id), format!("user-{id}")), Utc::now())
    }

    fn loads(chores: &[Chore]) -> HashMap<UserId, u32> {
        let mut loads = HashMap::new();
        for chore in chores {
            *loads.entry(chore.assignee().unwrap()).or_insert(0) += chore.weight();
        }
        loads
    }

    #[test]
    fn test_no_eligible_members_touches_nothing() {
        let mut chores = vec![chore(1, 20), chore(2, 10)];
        let before = chores.clone();

        let err = randomize(&mut chores, &[], &mut Identity, Utc::now(), None).unwrap_err();
        assert_eq!(err, EngineError::NoEligibleMembers);
        assert_eq!(chores, before);
    }

    #[test]
    fn test_no_chores_is_empty_success() {
        let mut chores: Vec<Chore> = Vec::new();
        let result = randomize(&mut chores, &[member(1)], &mut Identity, Utc::now(), None).unwrap();
        assert!(result.old.is_empty());
        assert!(result.new.is_empty());
    }

    #[test]
    fn test_single_member_gets_everything() {
        let mut chores = vec![chore(1, 20), chore(2, 10), chore(3, 15)];
        let result = randomize(
            &mut chores,
            &[member(7)],
            &mut StdRandom::seeded(3),
            Utc::now(),
            None,
        )
        .unwrap();

        assert_eq!(result.new.len(), 3);
        assert!(chores.iter().all(|c| c.assignee() == Some(UserId(7))));
    }

    #[test]
    fn test_three_chores_three_members() {
        let mut chores = vec![chore(1, 20), chore(2, 10), chore(3, 15)];
        let members = vec![member(1), member(2), member(3)];

        randomize(&mut chores, &members, &mut Identity, Utc::now(), None).unwrap();

        let mut assignees: Vec<UserId> = chores.iter().filter_map(Chore::assignee).collect();
        assignees.sort();
        assert_eq!(assignees, vec![UserId(1), UserId(2), UserId(3)]);
    }

    #[test]
    fn test_fewer_chores_than_members() {
        // Total weight 1 over 4 members: target would be 0 without the floor
        let mut chores = vec![chore(1, 5)];
        let members = vec![member(1), member(2), member(3), member(4)];

        let result = randomize(&mut chores, &members, &mut Identity, Utc::now(), None).unwrap();
        assert_eq!(result.new.len(), 1);
        assert_eq!(chores[0].assignee(), Some(UserId(1)));
    }

    #[test]
    fn test_zero_weight_chores_are_assigned() {
        let mut chores = vec![chore(1, 1), chore(2, 2), chore(3, 4)];
        let members = vec![member(1), member(2)];

        randomize(&mut chores, &members, &mut Identity, Utc::now(), None).unwrap();
        assert!(chores.iter().all(|c| c.assignee().is_some()));
    }

    #[test]
    fn test_uniform_weights_are_balanced() {
        for seed in 0..20 {
            let mut chores: Vec<Chore> = (1..=11).map(|id| chore(id, 10)).collect();
            let members = vec![member(1), member(2), member(3)];

            randomize(
                &mut chores,
                &members,
                &mut StdRandom::seeded(seed),
                Utc::now(),
                None,
            )
            .unwrap();

            let loads = loads(&chores);
            let max = loads.values().max().unwrap();
            let min = loads.values().min().unwrap();
            assert!(max - min <= 2, "seed {seed}: loads {loads:?}");
        }
    }

    #[test]
    fn test_mixed_weights_deal_in_turn() {
        // Dealt in order: 1 -> A, 2 -> B, 3 -> A, 4 -> B
        let mut chores = vec![chore(1, 60), chore(2, 5), chore(3, 60), chore(4, 5)];
        let members = vec![member(1), member(2)];

        randomize(&mut chores, &members, &mut Identity, Utc::now(), None).unwrap();

        let loads = loads(&chores);
        assert_eq!(loads[&UserId(1)], 24);
        assert_eq!(loads[&UserId(2)], 2);
    }

    #[test]
    fn test_previous_assignments_are_captured() {
        let earlier = Utc::now() - Duration::days(7);
        let mut chores = vec![chore(1, 20), chore(2, 10)];
        chores[0].assignment = Some(ChoreAssignment::new(ChoreId(1), UserId(2), earlier, None));

        let now = Utc::now();
        let result = randomize(
            &mut chores,
            &[member(1), member(2)],
            &mut Identity,
            now,
            Some(Duration::days(7)),
        )
        .unwrap();

        assert_eq!(result.old.len(), 1);
        assert_eq!(result.old[0].date_assigned, earlier);
        assert_eq!(result.new.len(), 2);
        for assignment in &result.new {
            assert_eq!(assignment.date_assigned, now);
            assert_eq!(assignment.date_due, Some(now + Duration::days(7)));
            assert!(!assignment.complete);
        }
    }
}
