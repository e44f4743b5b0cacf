//! Fail points for exercising error paths.
//!
//! Arming a [`FailPoint`] makes the next call that passes it return the
//! given error instead of touching the state. Each arming fires once.

use dashmap::DashMap;
use groupkeeper_storage::{StorageError, StorageResult};

/// Places in the in-memory backend where an error can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    BeginTransaction,
    InsertMembers,
    DeleteMembers,
    Commit,
}

#[derive(Debug, Default)]
pub(crate) struct FaultInjector {
    armed: DashMap<FailPoint, StorageError>,
}

impl FaultInjector {
    pub(crate) fn arm(&self, point: FailPoint, error: StorageError) {
        self.armed.insert(point, error);
    }

    pub(crate) fn disarm_all(&self) {
        self.armed.clear();
    }

    /// Fires the fail point if it is armed.
    pub(crate) fn check(&self, point: FailPoint) -> StorageResult<()> {
        match self.armed.remove(&point) {
            Some((_, error)) => {
                tracing::debug!(?point, %error, "Injected storage failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}
