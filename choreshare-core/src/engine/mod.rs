/// Chore distribution and rotation engine
///
/// Pure computation over already-loaded group state. Nothing here awaits or
/// touches storage; [`crate::orchestrator`] loads the inputs and persists
/// the result.
///
/// # Modules
///
/// - `random`: injectable random source and the Fisher–Yates shuffle
/// - `distribution`: weighted round-robin assignment of every chore
/// - `rotation`: cyclic reassignment around a ring of members
/// - `error`: invariant violations

use choreshare_shared::models::ChoreAssignment;
use serde::{Deserialize, Serialize};

pub mod distribution;
pub mod error;
pub mod random;
pub mod rotation;

pub use distribution::randomize;
pub use error::EngineError;
pub use random::{RandomSource, StdRandom};
pub use rotation::rotate;

/// Assignments replaced by one engine run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reassignment {
    /// Assignments the chores held before the run
    pub old: Vec<ChoreAssignment>,

    /// One fresh assignment per chore
    pub new: Vec<ChoreAssignment>,
}
