//! In-memory transaction with commit/rollback semantics.
//!
//! A transaction owns the state lock from `begin` until it finishes and
//! works on a staged copy of the tables. Commit publishes the copy;
//! rollback or drop discards it. Transactions are therefore serialized.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use groupkeeper_storage::{
    Group, GroupChanges, GroupId, GroupMembership, GroupTransaction, MembershipKey, NewGroup,
    NewMember, StorageError,
};

use crate::faults::{FailPoint, FaultInjector};
use crate::state::MemoryState;

/// Transaction over an [`InMemoryGroupStorage`](crate::InMemoryGroupStorage).
///
/// Calling the owning storage's auto-commit methods from the task that holds
/// an open transaction deadlocks: they wait for the same lock.
pub struct InMemoryTransaction {
    /// Taken on commit/rollback.
    guard: Option<OwnedMutexGuard<MemoryState>>,
    staged: MemoryState,
    faults: Arc<FaultInjector>,
}

impl InMemoryTransaction {
    pub(crate) fn new(guard: OwnedMutexGuard<MemoryState>, faults: Arc<FaultInjector>) -> Self {
        let staged = guard.clone();
        Self {
            guard: Some(guard),
            staged,
            faults,
        }
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.guard.is_none() {
            return Err(StorageError::transaction(
                "Transaction already completed (committed or rolled back)",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl GroupTransaction for InMemoryTransaction {
    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        self.faults.check(FailPoint::Commit)?;
        if let Some(mut guard) = self.guard.take() {
            *guard = std::mem::take(&mut self.staged);
            tracing::debug!("Transaction committed successfully");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        if self.guard.take().is_some() {
            tracing::debug!("Transaction rolled back successfully");
        }
        Ok(())
    }

    async fn create_group(&mut self, group: &NewGroup) -> Result<Group, StorageError> {
        self.ensure_open()?;
        self.staged.create_group(group)
    }

    async fn get_group(&mut self, id: GroupId) -> Result<Group, StorageError> {
        self.ensure_open()?;
        self.staged.get_group(id)
    }

    async fn update_group(
        &mut self,
        id: GroupId,
        changes: &GroupChanges,
    ) -> Result<Group, StorageError> {
        self.ensure_open()?;
        self.staged.update_group(id, changes)
    }

    async fn delete_group(&mut self, id: GroupId) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.staged.delete_group(id)
    }

    async fn list_memberships(
        &mut self,
        group_ids: &[GroupId],
    ) -> Result<Vec<GroupMembership>, StorageError> {
        self.ensure_open()?;
        Ok(self.staged.list_memberships(group_ids))
    }

    async fn insert_members(
        &mut self,
        group_id: GroupId,
        members: &[NewMember],
        actor: &str,
    ) -> Result<u64, StorageError> {
        self.ensure_open()?;
        self.faults.check(FailPoint::InsertMembers)?;
        self.staged.insert_members(group_id, members, actor)
    }

    async fn delete_members(&mut self, keys: &[MembershipKey]) -> Result<u64, StorageError> {
        self.ensure_open()?;
        self.faults.check(FailPoint::DeleteMembers)?;
        Ok(self.staged.delete_members(keys))
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::warn!(
                "InMemoryTransaction dropped without explicit commit/rollback - staged changes discarded"
            );
        }
    }
}
