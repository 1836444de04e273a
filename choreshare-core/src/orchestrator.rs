/// Chore distribution orchestrator
///
/// Runs the engine against stored group state and persists the outcome.
///
/// # Flow
///
/// ```text
/// ChoreDistributor::randomize / rotate
///   ├─> GroupLocks: exclusive access to the group
///   ├─> Repository: group, memberships, member roles, chores
///   ├─> auth: actor must hold EditChores
///   ├─> engine: randomize or rotate over chore-eligible members
///   └─> Repository: replace_assignments(old, new)
/// ```
///
/// The group lock is held from the first read to the final write, so two
/// requests for the same group never interleave. The random source is
/// locked only while the engine runs, never across an await.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use choreshare_core::orchestrator::ChoreDistributor;
/// use choreshare_core::services::{ChoreService, GroupService};
/// use choreshare_shared::models::NewChore;
/// use choreshare_shared::repository::{MemoryRepository, Repository};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
/// let owner = repo.create_user("alice").await?;
/// let member = repo.create_user("bob").await?;
///
/// let groups = GroupService::new(repo.clone());
/// let group = groups.create_group("Flat 4B", owner.id).await?;
/// groups.add_member(group.id, owner.id, member.id).await?;
///
/// ChoreService::new(repo.clone())
///     .create_chore(group.id, owner.id, NewChore::new("Dishes", 20))
///     .await?;
///
/// let distributor = ChoreDistributor::new(repo);
/// let diff = distributor.randomize(group.id, owner.id).await?;
/// assert_eq!(diff.new.len(), 1);
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use choreshare_shared::auth::{require_membership, require_permission};
use choreshare_shared::models::membership::eligible_members;
use choreshare_shared::models::{ChoreAssignment, GroupId, Membership, Permission, UserId};
use choreshare_shared::repository::Repository;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::{self, RandomSource, Reassignment, StdRandom};
use crate::error::ServiceResult;
use crate::lock::GroupLocks;
use crate::services::load_memberships;

/// Distributor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// Days from assignment until a chore is due; 0 disables due dates
    pub due_after_days: u32,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        DistributorConfig { due_after_days: 7 }
    }
}

impl DistributorConfig {
    /// Offset applied to `date_assigned` to get `date_due`
    pub fn due_after(&self) -> Option<Duration> {
        (self.due_after_days > 0).then(|| Duration::days(i64::from(self.due_after_days)))
    }
}

/// Outcome of one randomize or rotate run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDiff {
    /// Group the run applied to
    pub group_id: GroupId,

    /// Assignments that were deleted
    pub old: Vec<ChoreAssignment>,

    /// Assignments that were inserted
    pub new: Vec<ChoreAssignment>,

    /// Chores whose assignee differs from before (including newly assigned)
    pub changed: usize,
}

impl AssignmentDiff {
    fn new(group_id: GroupId, reassignment: Reassignment) -> Self {
        let previous: HashMap<_, _> = reassignment
            .old
            .iter()
            .map(|a| (a.chore_id, a.user_id))
            .collect();
        let changed = reassignment
            .new
            .iter()
            .filter(|a| previous.get(&a.chore_id) != Some(&a.user_id))
            .count();

        AssignmentDiff {
            group_id,
            old: reassignment.old,
            new: reassignment.new,
            changed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Run {
    Randomize,
    Rotate,
}

impl Run {
    fn as_str(&self) -> &'static str {
        match self {
            Run::Randomize => "randomize",
            Run::Rotate => "rotate",
        }
    }
}

/// Distributes and rotates chores for groups
pub struct ChoreDistributor {
    /// Storage
    repo: Arc<dyn Repository>,

    /// Per-group exclusion
    locks: GroupLocks,

    /// Shuffle source for randomize
    rng: Mutex<Box<dyn RandomSource>>,

    /// Configuration
    config: DistributorConfig,
}

impl ChoreDistributor {
    /// Creates a distributor with an OS-seeded random source and default
    /// configuration
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self::with_config(
            repo,
            DistributorConfig::default(),
            Box::new(StdRandom::from_entropy()),
        )
    }

    /// Creates a distributor with explicit configuration and random source
    pub fn with_config(
        repo: Arc<dyn Repository>,
        config: DistributorConfig,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        ChoreDistributor {
            repo,
            locks: GroupLocks::new(),
            rng: Mutex::new(rng),
            config,
        }
    }

    /// Randomly redistributes every chore in the group
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - `Authorization` if `actor` is not a member holding `EditChores`
    /// - `Invariant` if no member is chore-eligible
    /// - `Storage` if loading or persisting fails
    pub async fn randomize(
        &self,
        group_id: GroupId,
        actor: UserId,
    ) -> ServiceResult<AssignmentDiff> {
        self.run(group_id, actor, Run::Randomize).await
    }

    /// Passes every chore to the next chore-eligible member by user ID
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - `Authorization` if `actor` is not a member holding `EditChores`
    /// - `Invariant` if no member is chore-eligible, a chore is unassigned,
    ///   or a chore's assignee is no longer chore-eligible
    /// - `Storage` if loading or persisting fails
    pub async fn rotate(&self, group_id: GroupId, actor: UserId) -> ServiceResult<AssignmentDiff> {
        self.run(group_id, actor, Run::Rotate).await
    }

    async fn run(&self, group_id: GroupId, actor: UserId, run: Run) -> ServiceResult<AssignmentDiff> {
        let result = self.run_locked(group_id, actor, run).await;
        match &result {
            Ok(diff) => info!(
                group_id = %group_id,
                actor = %actor,
                run = run.as_str(),
                chores = diff.new.len(),
                changed = diff.changed,
                "Chore assignments replaced"
            ),
            Err(e) => e.log(run.as_str()),
        }
        result
    }

    async fn run_locked(
        &self,
        group_id: GroupId,
        actor: UserId,
        run: Run,
    ) -> ServiceResult<AssignmentDiff> {
        let _guard = self.locks.acquire(group_id).await;
        debug!(group_id = %group_id, run = run.as_str(), "Group lock acquired");

        let group = self.repo.get_group(group_id).await?;
        let memberships = load_memberships(self.repo.as_ref(), group.id).await?;
        {
            let member = require_membership(&memberships, group.id, actor)?;
            require_permission(member, Permission::EditChores)?;
        }
        let mut chores = self.repo.list_chores(group.id).await?;

        let eligible = eligible_members(memberships);
        let now = Utc::now();
        let due_after = self.config.due_after();

        let reassignment = match run {
            Run::Randomize => {
                let mut rng = self
                    .rng
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                engine::randomize(&mut chores, &eligible, rng.as_mut(), now, due_after)?
            }
            Run::Rotate => {
                let ring: Vec<UserId> = eligible.iter().map(Membership::user_id).collect();
                engine::rotate(&mut chores, &ring, now, due_after)?
            }
        };

        self.repo
            .replace_assignments(&reassignment.old, &reassignment.new)
            .await?;

        Ok(AssignmentDiff::new(group.id, reassignment))
    }
}
