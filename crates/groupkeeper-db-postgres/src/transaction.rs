//! PostgreSQL transaction implementation.
//!
//! Wraps an sqlx transaction so the reconciler's insert and delete run on the
//! same connection and commit or roll back together.

use async_trait::async_trait;
use sqlx_postgres::{PgConnection, PgTransaction};
use tokio::sync::Mutex;

use groupkeeper_storage::{
    Group, GroupChanges, GroupId, GroupMembership, GroupTransaction, MembershipKey, NewGroup,
    NewMember, StorageError,
};

use crate::error::classify_sqlx_error;
use crate::queries;

/// PostgreSQL transaction wrapper.
///
/// The transaction rolls back on drop if not explicitly committed.
pub struct PostgresTransaction {
    /// Taken on commit or rollback. The mutex makes the handle `Sync`.
    tx: Mutex<Option<PgTransaction<'static>>>,
}

impl PostgresTransaction {
    /// Wraps an open sqlx transaction.
    pub fn new(tx: PgTransaction<'static>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    fn conn(&mut self) -> Result<&mut PgConnection, StorageError> {
        self.tx.get_mut().as_mut().map(|tx| &mut **tx).ok_or_else(|| {
            StorageError::transaction("Transaction already completed (committed or rolled back)")
        })
    }
}

/// Connectivity failures keep their kind; anything else is a transaction error.
fn completion_error(action: &str, err: sqlx_core::Error) -> StorageError {
    match classify_sqlx_error(err) {
        err if err.is_connection_error() => err,
        err => StorageError::transaction(format!("Failed to {action} transaction: {err}")),
    }
}

#[async_trait]
impl GroupTransaction for PostgresTransaction {
    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.get_mut().take() {
            tx.commit()
                .await
                .map_err(|e| completion_error("commit", e))?;
            tracing::debug!("Transaction committed successfully");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.get_mut().take() {
            tx.rollback()
                .await
                .map_err(|e| completion_error("rollback", e))?;
            tracing::debug!("Transaction rolled back successfully");
        }
        Ok(())
    }

    async fn create_group(&mut self, group: &NewGroup) -> Result<Group, StorageError> {
        queries::groups::create(self.conn()?, group).await
    }

    async fn get_group(&mut self, id: GroupId) -> Result<Group, StorageError> {
        queries::groups::get(self.conn()?, id).await
    }

    async fn update_group(
        &mut self,
        id: GroupId,
        changes: &GroupChanges,
    ) -> Result<Group, StorageError> {
        queries::groups::update(self.conn()?, id, changes).await
    }

    async fn delete_group(&mut self, id: GroupId) -> Result<(), StorageError> {
        queries::groups::delete(self.conn()?, id).await
    }

    async fn list_memberships(
        &mut self,
        group_ids: &[GroupId],
    ) -> Result<Vec<GroupMembership>, StorageError> {
        queries::memberships::list_for_groups(self.conn()?, group_ids).await
    }

    async fn insert_members(
        &mut self,
        group_id: GroupId,
        members: &[NewMember],
        actor: &str,
    ) -> Result<u64, StorageError> {
        queries::memberships::insert_many(self.conn()?, group_id, members, actor).await
    }

    async fn delete_members(&mut self, keys: &[MembershipKey]) -> Result<u64, StorageError> {
        queries::memberships::delete_many(self.conn()?, keys).await
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if self.tx.get_mut().is_some() {
            tracing::warn!("Transaction dropped without explicit commit or rollback - rolling back");
        }
    }
}
