/// Per-group exclusion
///
/// Randomize and rotate each read a group's state, compute new assignments
/// and write them back. Two of these running at once on the same group
/// would both delete the same old rows and insert conflicting new ones.
/// `GroupLocks` serializes them per group; different groups proceed in
/// parallel.
///
/// An entry lives only while someone holds or waits on it. Every `acquire`
/// first drops entries whose mutex is referenced by the map alone, so the
/// map stays bounded by the number of groups with a run in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use choreshare_shared::models::GroupId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map of group ID to an async mutex
#[derive(Debug, Default)]
pub struct GroupLocks {
    locks: Mutex<HashMap<GroupId, Arc<AsyncMutex<()>>>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `group_id`
    ///
    /// Access is held until the returned guard is dropped.
    pub async fn acquire(&self, group_id: GroupId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(group_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of groups with a run holding or waiting on their lock, plus
    /// any released since the last `acquire`
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
