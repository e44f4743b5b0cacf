//! The table contents of the in-memory backend.
//!
//! Every mutating method validates its whole input before touching any
//! table, so a failed call leaves the state unchanged. That gives each call
//! statement-level atomicity; transactions add the multi-statement kind on
//! top by working on a staged copy.

use std::collections::BTreeMap;

use groupkeeper_storage::{
    Group, GroupChanges, GroupId, GroupMembership, GroupUserAssociation, MembershipKey, NewGroup,
    NewMember, StorageError, StorageResult, User, UserId,
};
use time::OffsetDateTime;

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    groups: BTreeMap<GroupId, Group>,
    users: BTreeMap<UserId, User>,
    memberships: BTreeMap<MembershipKey, GroupUserAssociation>,
    last_group_id: i64,
    last_user_id: i64,
}

impl MemoryState {
    fn name_taken(&self, name: &str, except: Option<GroupId>) -> bool {
        self.groups
            .values()
            .any(|g| g.name == name && Some(g.id) != except)
    }

    pub(crate) fn create_group(&mut self, new: &NewGroup) -> StorageResult<Group> {
        if self.name_taken(&new.name, None) {
            return Err(StorageError::constraint_violation(format!(
                "group name '{}' already exists",
                new.name
            )));
        }
        self.last_group_id += 1;
        let group = Group {
            id: GroupId(self.last_group_id),
            name: new.name.clone(),
            description: new.description.clone(),
            created_at: OffsetDateTime::now_utc(),
            created_by: new.created_by.clone(),
        };
        self.groups.insert(group.id, group.clone());
        Ok(group)
    }

    pub(crate) fn get_group(&self, id: GroupId) -> StorageResult<Group> {
        self.groups
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Group", id))
    }

    pub(crate) fn list_groups(&self) -> Vec<Group> {
        self.groups.values().cloned().collect()
    }

    pub(crate) fn update_group(
        &mut self,
        id: GroupId,
        changes: &GroupChanges,
    ) -> StorageResult<Group> {
        if !self.groups.contains_key(&id) {
            return Err(StorageError::not_found("Group", id));
        }
        if self.name_taken(&changes.name, Some(id)) {
            return Err(StorageError::constraint_violation(format!(
                "group name '{}' already exists",
                changes.name
            )));
        }
        let group = self
            .groups
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Group", id))?;
        group.name = changes.name.clone();
        group.description = changes.description.clone();
        Ok(group.clone())
    }

    /// Removes the group and cascades to its memberships.
    pub(crate) fn delete_group(&mut self, id: GroupId) -> StorageResult<()> {
        if self.groups.remove(&id).is_none() {
            return Err(StorageError::not_found("Group", id));
        }
        self.memberships.retain(|key, _| key.group_id != id);
        Ok(())
    }

    pub(crate) fn delete_all_groups(&mut self) -> u64 {
        let count = self.groups.len() as u64;
        self.groups.clear();
        self.memberships.clear();
        count
    }

    pub(crate) fn group_exists(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    pub(crate) fn group_exists_with_name(&self, name: &str) -> bool {
        self.name_taken(name, None)
    }

    pub(crate) fn list_memberships(&self, group_ids: &[GroupId]) -> Vec<GroupMembership> {
        self.memberships
            .values()
            .filter(|a| group_ids.contains(&a.group_id))
            .filter_map(|a| {
                // Inner join: a membership without its user row is not returned.
                self.users.get(&a.user_id).map(|user| GroupMembership {
                    group_id: a.group_id,
                    user_id: a.user_id,
                    membership_type: a.membership_type,
                    username: user.username.clone(),
                })
            })
            .collect()
    }

    pub(crate) fn associations(&self) -> Vec<GroupUserAssociation> {
        self.memberships.values().cloned().collect()
    }

    pub(crate) fn create_user(&mut self, username: &str) -> StorageResult<User> {
        if self.users.values().any(|u| u.username == username) {
            return Err(StorageError::constraint_violation(format!(
                "username '{username}' already exists"
            )));
        }
        self.last_user_id += 1;
        let user = User {
            id: UserId(self.last_user_id),
            username: username.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Bulk insert with the constraints of the membership table: the group
    /// and every user must exist, and no (group, user) pair may repeat,
    /// neither against stored rows nor within the batch.
    pub(crate) fn insert_members(
        &mut self,
        group_id: GroupId,
        members: &[NewMember],
        actor: &str,
    ) -> StorageResult<u64> {
        if !self.groups.contains_key(&group_id) {
            return Err(StorageError::constraint_violation(format!(
                "group {group_id} does not exist"
            )));
        }

        let mut batch: BTreeMap<MembershipKey, GroupUserAssociation> = BTreeMap::new();
        let now = OffsetDateTime::now_utc();
        for member in members {
            if !self.users.contains_key(&member.user_id) {
                return Err(StorageError::constraint_violation(format!(
                    "user {} does not exist",
                    member.user_id
                )));
            }
            let key = MembershipKey::new(group_id, member.user_id);
            if self.memberships.contains_key(&key) || batch.contains_key(&key) {
                return Err(StorageError::constraint_violation(format!(
                    "user {} is already a member of group {group_id}",
                    member.user_id
                )));
            }
            batch.insert(
                key,
                GroupUserAssociation {
                    group_id,
                    user_id: member.user_id,
                    membership_type: member.membership_type,
                    created_by: actor.to_string(),
                    created_at: now,
                },
            );
        }

        let inserted = batch.len() as u64;
        self.memberships.extend(batch);
        Ok(inserted)
    }

    pub(crate) fn delete_members(&mut self, keys: &[MembershipKey]) -> u64 {
        keys.iter()
            .filter(|key| self.memberships.remove(*key).is_some())
            .count() as u64
    }
}
