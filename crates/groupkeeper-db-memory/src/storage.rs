use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use groupkeeper_storage::{
    Group, GroupChanges, GroupId, GroupMembership, GroupStorage, GroupTransaction,
    GroupUserAssociation, NewGroup, StorageError, User,
};

use crate::faults::{FailPoint, FaultInjector};
use crate::state::MemoryState;
use crate::transaction::InMemoryTransaction;

/// In-memory group storage backend.
///
/// This storage implementation provides:
/// - The same constraints as the PostgreSQL schema (unique names, unique
///   (group, user) pairs, foreign keys, cascade on group delete)
/// - Serialized transactions with rollback
/// - Fail points for error-path testing
#[derive(Debug, Default, Clone)]
pub struct InMemoryGroupStorage {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<FaultInjector>,
}

impl InMemoryGroupStorage {
    /// Creates a new, empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call passing `point` fail with `error`.
    pub fn fail_next(&self, point: FailPoint, error: StorageError) {
        self.faults.arm(point, error);
    }

    /// Disarms every pending fail point.
    pub fn clear_failures(&self) {
        self.faults.disarm_all();
    }

    /// Returns every committed membership row, ordered by (group, user).
    pub async fn associations(&self) -> Vec<GroupUserAssociation> {
        self.state.lock().await.associations()
    }
}

#[async_trait]
impl GroupStorage for InMemoryGroupStorage {
    async fn begin_transaction(&self) -> Result<Box<dyn GroupTransaction>, StorageError> {
        self.faults.check(FailPoint::BeginTransaction)?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(InMemoryTransaction::new(
            guard,
            Arc::clone(&self.faults),
        )))
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group, StorageError> {
        self.state.lock().await.create_group(group)
    }

    async fn get_group(&self, id: GroupId) -> Result<Group, StorageError> {
        self.state.lock().await.get_group(id)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        Ok(self.state.lock().await.list_groups())
    }

    async fn update_group(
        &self,
        id: GroupId,
        changes: &GroupChanges,
    ) -> Result<Group, StorageError> {
        self.state.lock().await.update_group(id, changes)
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), StorageError> {
        self.state.lock().await.delete_group(id)
    }

    async fn delete_all_groups(&self) -> Result<u64, StorageError> {
        Ok(self.state.lock().await.delete_all_groups())
    }

    async fn group_exists(&self, id: GroupId) -> Result<bool, StorageError> {
        Ok(self.state.lock().await.group_exists(id))
    }

    async fn group_exists_with_name(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.state.lock().await.group_exists_with_name(name))
    }

    async fn list_memberships(
        &self,
        group_ids: &[GroupId],
    ) -> Result<Vec<GroupMembership>, StorageError> {
        Ok(self.state.lock().await.list_memberships(group_ids))
    }

    async fn create_user(&self, username: &str) -> Result<User, StorageError> {
        self.state.lock().await.create_user(username)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupkeeper_storage::{MembershipKey, NewMember};

    #[tokio::test]
    async fn test_storage_basic_operations() {
        let storage = InMemoryGroupStorage::new();

        let group = storage
            .create_group(&NewGroup::new("admins", "sys").with_description("Administrators"))
            .await
            .unwrap();
        assert!(storage.group_exists(group.id).await.unwrap());
        assert!(storage.group_exists_with_name("admins").await.unwrap());
        assert!(!storage.group_exists_with_name("nobody").await.unwrap());

        let fetched = storage.get_group(group.id).await.unwrap();
        assert_eq!(fetched, group);

        let err = storage
            .create_group(&NewGroup::new("admins", "sys"))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());

        storage.delete_group(group.id).await.unwrap();
        assert!(storage.get_group(group.id).await.unwrap_err().is_not_found());
        assert!(!storage.group_exists(group.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_commit_publishes_changes() {
        let storage = InMemoryGroupStorage::new();
        let user = storage.create_user("alice").await.unwrap();

        let mut tx = storage.begin_transaction().await.unwrap();
        let group = tx.create_group(&NewGroup::new("ops", "sys")).await.unwrap();
        tx.insert_members(group.id, &[NewMember::member(user.id)], "sys")
            .await
            .unwrap();
        // Visible inside the transaction before commit.
        assert_eq!(tx.list_memberships(&[group.id]).await.unwrap().len(), 1);
        tx.commit().await.unwrap();

        let members = storage.list_memberships(&[group.id]).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "alice");
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_changes() {
        let storage = InMemoryGroupStorage::new();

        let mut tx = storage.begin_transaction().await.unwrap();
        tx.create_group(&NewGroup::new("ops", "sys")).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(storage.list_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_changes() {
        let storage = InMemoryGroupStorage::new();
        {
            let mut tx = storage.begin_transaction().await.unwrap();
            tx.create_group(&NewGroup::new("ops", "sys")).await.unwrap();
        }
        assert!(!storage.group_exists_with_name("ops").await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_point_on_delete_members() {
        let storage = InMemoryGroupStorage::new();
        let group = storage
            .create_group(&NewGroup::new("ops", "sys"))
            .await
            .unwrap();
        storage.fail_next(FailPoint::DeleteMembers, StorageError::connection("reset"));

        let mut tx = storage.begin_transaction().await.unwrap();
        let err = tx
            .delete_members(&[MembershipKey::new(group.id, groupkeeper_storage::UserId(1))])
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_all_groups() {
        let storage = InMemoryGroupStorage::new();
        storage.create_group(&NewGroup::new("a", "sys")).await.unwrap();
        storage.create_group(&NewGroup::new("b", "sys")).await.unwrap();

        assert_eq!(storage.delete_all_groups().await.unwrap(), 2);
        assert!(storage.list_groups().await.unwrap().is_empty());
    }
}
