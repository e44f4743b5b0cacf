//! Membership delta computation.
//!
//! Turns "current membership" and "desired membership" into the rows to
//! insert and the keys to delete.

use std::collections::{HashMap, HashSet};

use crate::error::StorageError;
use crate::types::{GroupId, GroupMembership, MembershipKey, MembershipType, NewMember, UserId};

/// The changes that take a group from its current to its desired membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    /// Users not currently in the group.
    pub to_add: Vec<NewMember>,
    /// Memberships whose user is not in the desired set.
    pub to_remove: Vec<MembershipKey>,
    /// Users already in the group whose membership type changes. Applied as
    /// delete of the old row followed by insert of the new one.
    pub retyped: Vec<NewMember>,
}

impl MembershipDelta {
    /// Computes the delta for `group_id`.
    ///
    /// Entries of `current` belonging to other groups are ignored. All
    /// outputs are sorted by user ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if `desired` names a user twice.
    pub fn between(
        group_id: GroupId,
        current: &[GroupMembership],
        desired: &[NewMember],
    ) -> Result<Self, StorageError> {
        let mut wanted: HashMap<UserId, MembershipType> = HashMap::with_capacity(desired.len());
        for member in desired {
            if wanted
                .insert(member.user_id, member.membership_type)
                .is_some()
            {
                return Err(StorageError::invalid_input(format!(
                    "user {} appears more than once in the desired membership of group {group_id}",
                    member.user_id
                )));
            }
        }

        let existing: HashMap<UserId, MembershipType> = current
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| (m.user_id, m.membership_type))
            .collect();

        let mut delta = Self::default();
        for (&user_id, &membership_type) in &wanted {
            match existing.get(&user_id) {
                None => delta.to_add.push(NewMember::new(user_id, membership_type)),
                Some(&old) if old != membership_type => {
                    delta.retyped.push(NewMember::new(user_id, membership_type));
                }
                Some(_) => {}
            }
        }
        for &user_id in existing.keys() {
            if !wanted.contains_key(&user_id) {
                delta.to_remove.push(MembershipKey::new(group_id, user_id));
            }
        }

        delta.to_add.sort_by_key(|m| m.user_id);
        delta.retyped.sort_by_key(|m| m.user_id);
        delta.to_remove.sort();
        Ok(delta)
    }

    /// Returns `true` if applying this delta changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.retyped.is_empty()
    }
}

/// Counts (group, user) pairs that are both added and removed.
///
/// The insert runs before the delete, so such a pair ends up absent.
pub(crate) fn overlapping_pairs(
    group_id: GroupId,
    users_to_add: &[NewMember],
    users_to_remove: &[MembershipKey],
) -> usize {
    if users_to_add.is_empty() || users_to_remove.is_empty() {
        return 0;
    }
    let removed: HashSet<&MembershipKey> = users_to_remove.iter().collect();
    users_to_add
        .iter()
        .filter(|m| removed.contains(&MembershipKey::new(group_id, m.user_id)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(group: i64, user: i64, membership_type: MembershipType) -> GroupMembership {
        GroupMembership {
            group_id: GroupId(group),
            user_id: UserId(user),
            membership_type,
            username: format!("user{user}"),
        }
    }

    #[test]
    fn test_delta_adds_removes_and_retypes() {
        let current = vec![
            membership(1, 10, MembershipType::Member),
            membership(1, 12, MembershipType::Member),
            membership(1, 13, MembershipType::Owner),
        ];
        let desired = vec![
            NewMember::owner(UserId(11)),
            NewMember::owner(UserId(12)),
            NewMember::owner(UserId(13)),
        ];

        let delta = MembershipDelta::between(GroupId(1), &current, &desired).unwrap();

        assert_eq!(delta.to_add, vec![NewMember::owner(UserId(11))]);
        assert_eq!(delta.retyped, vec![NewMember::owner(UserId(12))]);
        assert_eq!(
            delta.to_remove,
            vec![MembershipKey::new(GroupId(1), UserId(10))]
        );
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_delta_ignores_other_groups() {
        let current = vec![membership(2, 10, MembershipType::Member)];
        let delta = MembershipDelta::between(GroupId(1), &current, &[]).unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn test_delta_rejects_duplicate_desired_user() {
        let desired = vec![NewMember::member(UserId(5)), NewMember::owner(UserId(5))];
        let err = MembershipDelta::between(GroupId(1), &[], &desired).unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput { .. }));
    }

    #[test]
    fn test_overlapping_pairs() {
        let adds = vec![NewMember::member(UserId(10)), NewMember::owner(UserId(11))];

        let same_pair = vec![MembershipKey::new(GroupId(1), UserId(10))];
        assert_eq!(overlapping_pairs(GroupId(1), &adds, &same_pair), 1);

        // Same user, different group: not the same pair.
        let other_group = vec![MembershipKey::new(GroupId(2), UserId(10))];
        assert_eq!(overlapping_pairs(GroupId(1), &adds, &other_group), 0);

        assert_eq!(overlapping_pairs(GroupId(1), &[], &same_pair), 0);
    }
}
