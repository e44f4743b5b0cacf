//! Group membership statements.
//!
//! Bulk writes bind whole columns as arrays and expand them with `UNNEST`, so
//! a batch of any size is a single statement.

use groupkeeper_storage::{
    GroupId, GroupMembership, MembershipKey, MembershipType, NewMember, StorageError, UserId,
};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgConnection;

use crate::error::classify_sqlx_error;

/// Raw joined row: (group_id, user_id, membership_type, username).
type MembershipRow = (i64, i64, String, String);

fn membership_from_row(row: MembershipRow) -> Result<GroupMembership, StorageError> {
    let (group_id, user_id, membership_type, username) = row;
    Ok(GroupMembership {
        group_id: GroupId(group_id),
        user_id: UserId(user_id),
        membership_type: membership_type.parse::<MembershipType>()?,
        username,
    })
}

/// Inserts all `members` into `group_id` with one statement.
pub async fn insert_many(
    conn: &mut PgConnection,
    group_id: GroupId,
    members: &[NewMember],
    actor: &str,
) -> Result<u64, StorageError> {
    let user_ids: Vec<i64> = members.iter().map(|m| m.user_id.0).collect();
    let membership_types: Vec<String> = members
        .iter()
        .map(|m| m.membership_type.as_str().to_string())
        .collect();

    let result = query(
        r#"
        INSERT INTO group_users (group_id, user_id, membership_type, created_by)
        SELECT $1::BIGINT, m.user_id, m.membership_type, $4::TEXT
        FROM UNNEST($2::BIGINT[], $3::TEXT[]) AS m(user_id, membership_type)
        "#,
    )
    .bind(group_id.0)
    .bind(user_ids)
    .bind(membership_types)
    .bind(actor)
    .execute(conn)
    .await
    .map_err(classify_sqlx_error)?;

    Ok(result.rows_affected())
}

/// Deletes every row whose (group_id, user_id) pair is in `keys`.
pub async fn delete_many(
    conn: &mut PgConnection,
    keys: &[MembershipKey],
) -> Result<u64, StorageError> {
    let group_ids: Vec<i64> = keys.iter().map(|k| k.group_id.0).collect();
    let user_ids: Vec<i64> = keys.iter().map(|k| k.user_id.0).collect();

    let result = query(
        r#"
        DELETE FROM group_users
        WHERE (group_id, user_id) IN (
            SELECT k.group_id, k.user_id
            FROM UNNEST($1::BIGINT[], $2::BIGINT[]) AS k(group_id, user_id)
        )
        "#,
    )
    .bind(group_ids)
    .bind(user_ids)
    .execute(conn)
    .await
    .map_err(classify_sqlx_error)?;

    Ok(result.rows_affected())
}

/// Lists memberships of the given groups joined with usernames.
pub async fn list_for_groups(
    conn: &mut PgConnection,
    group_ids: &[GroupId],
) -> Result<Vec<GroupMembership>, StorageError> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = group_ids.iter().map(|id| id.0).collect();

    let rows: Vec<MembershipRow> = query_as(
        r#"
        SELECT gu.group_id, gu.user_id, gu.membership_type, u.username
        FROM group_users gu
        JOIN users u ON u.id = gu.user_id
        WHERE gu.group_id = ANY($1::BIGINT[])
        ORDER BY gu.group_id, gu.user_id
        "#,
    )
    .bind(ids)
    .fetch_all(conn)
    .await
    .map_err(classify_sqlx_error)?;

    rows.into_iter().map(membership_from_row).collect()
}
