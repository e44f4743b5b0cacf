//! Group membership reconciliation.
//!
//! Applies a batch of membership additions and removals as one atomic unit:
//! a single bulk insert followed by a single set-membership delete, both in
//! the same transaction.

use tracing::{debug, instrument, warn};

use crate::delta::{MembershipDelta, overlapping_pairs};
use crate::error::StorageError;
use crate::traits::GroupTransaction;
use crate::types::{Group, GroupId, MembershipKey, NewGroup, NewMember};
use crate::{DynGroupStorage, StorageResult};

/// Runs the reconcile statements inside a transaction the caller already
/// holds. The transaction is neither committed nor rolled back here.
///
/// `users_to_remove` may reference groups other than `group_id`. A pair that
/// is both added and removed is inserted, then deleted.
///
/// # Errors
///
/// Returns whatever the gateway reports.
pub async fn reconcile_within(
    tx: &mut dyn GroupTransaction,
    group_id: GroupId,
    users_to_add: &[NewMember],
    users_to_remove: &[MembershipKey],
    actor: &str,
) -> StorageResult<()> {
    let overlapping = overlapping_pairs(group_id, users_to_add, users_to_remove);
    if overlapping > 0 {
        warn!(overlapping, "Membership pairs are both added and removed");
    }

    if !users_to_add.is_empty() {
        let inserted = tx.insert_members(group_id, users_to_add, actor).await?;
        debug!(inserted, "Inserted group members");
    }
    if !users_to_remove.is_empty() {
        let deleted = tx.delete_members(users_to_remove).await?;
        debug!(deleted, "Deleted group members");
    }
    Ok(())
}

/// Commits `tx` if `result` is Ok, rolls it back otherwise.
///
/// A failed rollback is logged; the original error is what the caller sees.
async fn finish<T>(tx: Box<dyn GroupTransaction>, result: StorageResult<T>) -> StorageResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback after failed operation also failed");
            }
            Err(err)
        }
    }
}

/// Applies membership changes to groups atomically.
///
/// Holds no state besides the shared storage handle; concurrent calls are
/// arbitrated by the storage engine.
#[derive(Clone)]
pub struct GroupMembershipReconciler {
    storage: DynGroupStorage,
}

impl GroupMembershipReconciler {
    /// Creates a reconciler over the given storage.
    #[must_use]
    pub fn new(storage: DynGroupStorage) -> Self {
        Self { storage }
    }

    /// Returns the underlying storage.
    #[must_use]
    pub fn storage(&self) -> &DynGroupStorage {
        &self.storage
    }

    /// Adds `users_to_add` to `group_id` and deletes the `users_to_remove`
    /// memberships in one transaction.
    ///
    /// Either both statements take effect or neither does. Not idempotent:
    /// repeating a non-empty add fails with a constraint violation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConstraintViolation` for duplicate memberships or
    /// unknown groups/users, `StorageError::Connection` for transport
    /// failures.
    #[instrument(
        skip(self, users_to_add, users_to_remove),
        fields(
            backend = self.storage.backend_name(),
            adds = users_to_add.len(),
            removes = users_to_remove.len()
        )
    )]
    pub async fn reconcile(
        &self,
        group_id: GroupId,
        users_to_add: &[NewMember],
        users_to_remove: &[MembershipKey],
        actor: &str,
    ) -> StorageResult<()> {
        let mut tx = self.storage.begin_transaction().await?;
        let result =
            reconcile_within(tx.as_mut(), group_id, users_to_add, users_to_remove, actor).await;
        let result = finish(tx, result).await;

        match &result {
            Ok(()) => debug!("Membership reconciled"),
            Err(err) => warn!(error = %err, category = %err.category(), "Membership reconciliation failed"),
        }
        result
    }

    /// Creates a group and inserts its initial members in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConstraintViolation` if the name is taken or a
    /// member references an unknown user; nothing is persisted then.
    #[instrument(skip(self, group, members), fields(name = %group.name, members = members.len()))]
    pub async fn create_group_with_members(
        &self,
        group: &NewGroup,
        members: &[NewMember],
        actor: &str,
    ) -> StorageResult<Group> {
        let mut tx = self.storage.begin_transaction().await?;
        let result = async {
            let created = tx.create_group(group).await?;
            if !members.is_empty() {
                tx.insert_members(created.id, members, actor).await?;
            }
            Ok::<_, StorageError>(created)
        }
        .await;
        finish(tx, result).await
    }

    /// Makes the membership of `group_id` exactly `desired`.
    ///
    /// Reads the current membership inside the transaction, computes the
    /// [`MembershipDelta`], replaces the rows of retyped users (delete old,
    /// insert new), then runs the reconcile statements for the remaining
    /// additions and removals. Returns the applied delta.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the group does not exist,
    /// `StorageError::InvalidInput` if `desired` names a user twice.
    #[instrument(skip(self, desired), fields(desired = desired.len()))]
    pub async fn replace_members(
        &self,
        group_id: GroupId,
        desired: &[NewMember],
        actor: &str,
    ) -> StorageResult<MembershipDelta> {
        let mut tx = self.storage.begin_transaction().await?;
        let result = async {
            tx.get_group(group_id).await?;
            let current = tx.list_memberships(&[group_id]).await?;
            let delta = MembershipDelta::between(group_id, &current, desired)?;

            if !delta.retyped.is_empty() {
                let keys: Vec<MembershipKey> = delta
                    .retyped
                    .iter()
                    .map(|m| MembershipKey::new(group_id, m.user_id))
                    .collect();
                tx.delete_members(&keys).await?;
                tx.insert_members(group_id, &delta.retyped, actor).await?;
            }
            reconcile_within(tx.as_mut(), group_id, &delta.to_add, &delta.to_remove, actor)
                .await?;
            Ok::<_, StorageError>(delta)
        }
        .await;
        finish(tx, result).await
    }
}

impl std::fmt::Debug for GroupMembershipReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupMembershipReconciler")
            .field("backend", &self.storage.backend_name())
            .finish()
    }
}
