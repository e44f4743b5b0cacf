//! Storage traits for the group storage abstraction layer.
//!
//! [`GroupStorage`] is the persistence gateway: every call runs as its own
//! auto-committed unit of work. [`GroupTransaction`] is an explicit unit of
//! work obtained from [`GroupStorage::begin_transaction`]; operations that
//! must observe or change several rows atomically take one of these.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{
    Group, GroupChanges, GroupId, GroupMembership, MembershipKey, NewGroup, NewMember, User,
};

/// The gateway trait that all group storage backends must implement.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use groupkeeper_storage::{GroupStorage, GroupId, StorageError};
///
/// async fn describe(storage: &dyn GroupStorage, id: GroupId) -> Result<String, StorageError> {
///     let group = storage.get_group(id).await?;
///     Ok(group.description.unwrap_or_default())
/// }
/// ```
#[async_trait]
pub trait GroupStorage: Send + Sync {
    // ==================== Transactions ====================

    /// Begins a new transaction.
    ///
    /// The returned handle must be either committed or rolled back; dropping
    /// it rolls back.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if no connection can be acquired.
    async fn begin_transaction(&self) -> Result<Box<dyn GroupTransaction>, StorageError>;

    // ==================== Groups ====================

    /// Creates a new group.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConstraintViolation` if the name is taken.
    async fn create_group(&self, group: &NewGroup) -> Result<Group, StorageError>;

    /// Reads a group by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no group has this ID.
    async fn get_group(&self, id: GroupId) -> Result<Group, StorageError>;

    /// Lists all groups ordered by ID.
    async fn list_groups(&self) -> Result<Vec<Group>, StorageError>;

    /// Replaces the name and description of a group.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no group has this ID.
    /// Returns `StorageError::ConstraintViolation` if the new name is taken.
    async fn update_group(&self, id: GroupId, changes: &GroupChanges)
    -> Result<Group, StorageError>;

    /// Deletes a group and, through the storage engine, its memberships.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no group has this ID.
    async fn delete_group(&self, id: GroupId) -> Result<(), StorageError>;

    /// Deletes every group. Returns the number of deleted groups.
    async fn delete_all_groups(&self) -> Result<u64, StorageError>;

    /// Returns whether a group with this ID exists.
    async fn group_exists(&self, id: GroupId) -> Result<bool, StorageError>;

    /// Returns whether a group with this exact name exists.
    async fn group_exists_with_name(&self, name: &str) -> Result<bool, StorageError>;

    // ==================== Memberships ====================

    /// Returns every membership of the given groups, joined with the users
    /// table, ordered by (group ID, user ID).
    async fn list_memberships(
        &self,
        group_ids: &[GroupId],
    ) -> Result<Vec<GroupMembership>, StorageError>;

    // ==================== Users ====================

    /// Inserts a row into the users table.
    ///
    /// The users table belongs to the surrounding application; this exists
    /// so memberships have something to reference.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConstraintViolation` if the username is taken.
    async fn create_user(&self, username: &str) -> Result<User, StorageError>;

    // ==================== Metadata ====================

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// A unit of work for performing several operations atomically.
///
/// Operations within a transaction see each other's effects and are isolated
/// from other callers to the degree the backend's isolation level provides.
/// If `rollback` is called or the handle is dropped, all operations are
/// undone.
#[async_trait]
pub trait GroupTransaction: Send + Sync {
    /// Commits all operations in this transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Transaction` if the commit fails.
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Rolls back all operations in this transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Transaction` if the rollback fails.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;

    /// See `GroupStorage::create_group`.
    async fn create_group(&mut self, group: &NewGroup) -> Result<Group, StorageError>;

    /// See `GroupStorage::get_group`. Sees uncommitted changes of this transaction.
    async fn get_group(&mut self, id: GroupId) -> Result<Group, StorageError>;

    /// See `GroupStorage::update_group`.
    async fn update_group(
        &mut self,
        id: GroupId,
        changes: &GroupChanges,
    ) -> Result<Group, StorageError>;

    /// See `GroupStorage::delete_group`.
    async fn delete_group(&mut self, id: GroupId) -> Result<(), StorageError>;

    /// See `GroupStorage::list_memberships`. Sees uncommitted changes of this transaction.
    async fn list_memberships(
        &mut self,
        group_ids: &[GroupId],
    ) -> Result<Vec<GroupMembership>, StorageError>;

    /// Inserts one membership row per entry as a single bulk statement, each
    /// stamped with `actor` as creator. Returns the number of inserted rows.
    ///
    /// The statement is all-or-nothing: if any row violates a constraint, no
    /// row is inserted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConstraintViolation` for a duplicate (group, user)
    /// pair or an unknown group or user.
    async fn insert_members(
        &mut self,
        group_id: GroupId,
        members: &[NewMember],
        actor: &str,
    ) -> Result<u64, StorageError>;

    /// Deletes every membership row matching one of `keys` as a single
    /// set-membership delete. Returns the number of deleted rows.
    ///
    /// Keys are not required to share a group.
    async fn delete_members(&mut self, keys: &[MembershipKey]) -> Result<u64, StorageError>;
}
