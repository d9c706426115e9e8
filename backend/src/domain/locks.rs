use shared::BloodGroup;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per blood group.
///
/// Mutating ledger calls hold the locks of every group they may touch for the
/// whole unit of work. Locks are always taken in `BloodGroup::ALL` order.
#[derive(Debug)]
pub struct InventoryLocks {
    locks: [Arc<Mutex<()>>; 8],
}

/// Held locks; released on drop
#[derive(Debug)]
pub struct GroupGuards {
    guards: Vec<OwnedMutexGuard<()>>,
}

impl GroupGuards {
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl InventoryLocks {
    pub fn new() -> Self {
        Self {
            locks: std::array::from_fn(|_| Arc::new(Mutex::new(()))),
        }
    }

    /// Lock each distinct group in `groups`
    pub async fn acquire(&self, groups: &[BloodGroup]) -> GroupGuards {
        let mut indices: Vec<usize> = groups.iter().map(|group| group.index()).collect();
        indices.sort_unstable();
        indices.dedup();

        let mut guards = Vec::with_capacity(indices.len());
        for index in indices {
            guards.push(Arc::clone(&self.locks[index]).lock_owned().await);
        }
        GroupGuards { guards }
    }

    pub async fn acquire_all(&self) -> GroupGuards {
        self.acquire(&BloodGroup::ALL).await
    }
}

impl Default for InventoryLocks {
    fn default() -> Self {
        Self::new()
    }
}
