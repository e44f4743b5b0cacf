//! Property tests for group storage and reconciliation.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use groupkeeper_db_memory::{FailPoint, InMemoryGroupStorage};
use groupkeeper_storage::prelude::*;
use proptest::prelude::*;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime")
        .block_on(future)
}

fn membership_type() -> impl Strategy<Value = MembershipType> {
    prop_oneof![Just(MembershipType::Member), Just(MembershipType::Owner)]
}

#[derive(Debug, Clone, Copy)]
enum Plan {
    Untouched,
    Remove,
    Add(MembershipType),
}

fn plan() -> impl Strategy<Value = Plan> {
    prop_oneof![
        Just(Plan::Untouched),
        Just(Plan::Remove),
        membership_type().prop_map(Plan::Add),
    ]
}

/// Per user: the initial membership (if any) and what the reconcile call
/// does to it.
fn scenario() -> impl Strategy<Value = Vec<(Option<MembershipType>, Plan)>> {
    proptest::collection::vec((proptest::option::of(membership_type()), plan()), 1..12)
}

struct Seeded {
    storage: Arc<InMemoryGroupStorage>,
    reconciler: GroupMembershipReconciler,
    group: GroupId,
    adds: Vec<NewMember>,
    removes: Vec<MembershipKey>,
    before: BTreeMap<UserId, MembershipType>,
    expected: BTreeMap<UserId, MembershipType>,
}

async fn seed(users: &[(Option<MembershipType>, Plan)]) -> Seeded {
    let storage = Arc::new(InMemoryGroupStorage::new());
    let reconciler = GroupMembershipReconciler::new(storage.clone());
    let group = storage
        .create_group(&NewGroup::new("admins", "sys"))
        .await
        .unwrap()
        .id;

    let mut initial = Vec::new();
    let mut adds = Vec::new();
    let mut removes = Vec::new();
    let mut before = BTreeMap::new();
    let mut expected = BTreeMap::new();
    for (i, (current, plan)) in users.iter().enumerate() {
        let user = storage.create_user(&format!("user{i}")).await.unwrap().id;
        if let Some(membership_type) = current {
            initial.push(NewMember::new(user, *membership_type));
            before.insert(user, *membership_type);
        }
        match (plan, current) {
            (Plan::Remove, _) => removes.push(MembershipKey::new(group, user)),
            (Plan::Add(membership_type), None) => {
                adds.push(NewMember::new(user, *membership_type));
                expected.insert(user, *membership_type);
            }
            (_, Some(membership_type)) => {
                expected.insert(user, *membership_type);
            }
            (Plan::Untouched, None) => {}
        }
    }
    reconciler
        .reconcile(group, &initial, &[], "seed")
        .await
        .unwrap();

    Seeded {
        storage,
        reconciler,
        group,
        adds,
        removes,
        before,
        expected,
    }
}

async fn membership_map(
    storage: &InMemoryGroupStorage,
    group: GroupId,
) -> BTreeMap<UserId, MembershipType> {
    storage
        .list_memberships(&[group])
        .await
        .unwrap()
        .into_iter()
        .map(|m| (m.user_id, m.membership_type))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn created_group_reads_back(
        name in "[a-z][a-z0-9_-]{0,30}",
        description in proptest::option::of("[ -~]{0,64}"),
    ) {
        let (created, fetched) = block_on(async {
            let storage = InMemoryGroupStorage::new();
            let mut new_group = NewGroup::new(name.clone(), "sys");
            new_group.description = description.clone();
            let created = storage.create_group(&new_group).await.unwrap();
            let fetched = storage.get_group(created.id).await.unwrap();
            (created, fetched)
        });

        prop_assert_eq!(&fetched.name, &name);
        prop_assert_eq!(&fetched.description, &description);
        prop_assert_eq!(fetched, created);
    }

    #[test]
    fn absent_group_is_not_found(id in 1i64..10_000) {
        let (get, exists) = block_on(async {
            let storage = InMemoryGroupStorage::new();
            (storage.get_group(GroupId(id)).await, storage.group_exists(GroupId(id)).await)
        });

        prop_assert!(get.unwrap_err().is_not_found());
        prop_assert!(!exists.unwrap());
    }

    #[test]
    fn reconcile_applies_disjoint_sets(users in scenario()) {
        let (after, seeded) = block_on(async {
            let seeded = seed(&users).await;
            seeded
                .reconciler
                .reconcile(seeded.group, &seeded.adds, &seeded.removes, "sys")
                .await
                .unwrap();
            (membership_map(&seeded.storage, seeded.group).await, seeded)
        });

        for member in &seeded.adds {
            prop_assert_eq!(after.get(&member.user_id), Some(&member.membership_type));
        }
        for key in &seeded.removes {
            prop_assert!(!after.contains_key(&key.user_id));
        }
        prop_assert_eq!(after, seeded.expected);
    }

    #[test]
    fn reconcile_failure_leaves_membership_unchanged(users in scenario()) {
        let (result, after, seeded) = block_on(async {
            let seeded = seed(&users).await;
            seeded
                .storage
                .fail_next(FailPoint::DeleteMembers, StorageError::connection("reset"));
            let result = seeded
                .reconciler
                .reconcile(seeded.group, &seeded.adds, &seeded.removes, "sys")
                .await;
            seeded.storage.clear_failures();
            (result, membership_map(&seeded.storage, seeded.group).await, seeded)
        });

        if seeded.removes.is_empty() {
            // No delete statement runs, so the fail point never fires.
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.unwrap_err().is_connection_error());
            prop_assert_eq!(after, seeded.before);
        }
    }
}

#[tokio::test]
async fn test_admins_scenario() {
    let storage = Arc::new(InMemoryGroupStorage::new());
    let reconciler = GroupMembershipReconciler::new(storage.clone());
    for i in 1..=11 {
        storage.create_user(&format!("user{i}")).await.unwrap();
    }
    let admins = storage
        .create_group(&NewGroup::new("admins", "sys"))
        .await
        .unwrap();
    assert_eq!(admins.id, GroupId(1));
    reconciler
        .reconcile(admins.id, &[NewMember::member(UserId(10))], &[], "sys")
        .await
        .unwrap();

    reconciler
        .reconcile(
            GroupId(1),
            &[NewMember::owner(UserId(11))],
            &[MembershipKey::new(GroupId(1), UserId(10))],
            "sys",
        )
        .await
        .unwrap();

    let members: Vec<_> = storage
        .list_memberships(&[GroupId(1)])
        .await
        .unwrap()
        .into_iter()
        .map(|m| (m.group_id, m.user_id, m.membership_type))
        .collect();
    assert_eq!(
        members,
        vec![(GroupId(1), UserId(11), MembershipType::Owner)]
    );

    assert!(storage.group_exists_with_name("admins").await.unwrap());
    assert!(!storage.group_exists_with_name("never-created").await.unwrap());
}
