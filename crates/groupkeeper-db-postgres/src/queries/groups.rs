//! Group table statements.

use groupkeeper_storage::{Group, GroupChanges, GroupId, NewGroup, StorageError};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgConnection;
use time::OffsetDateTime;

use crate::error::classify_sqlx_error;

/// Raw `groups` row: (id, name, description, created_at, created_by).
pub(crate) type GroupRow = (i64, String, Option<String>, OffsetDateTime, String);

fn group_from_row(row: GroupRow) -> Group {
    let (id, name, description, created_at, created_by) = row;
    Group {
        id: GroupId(id),
        name,
        description,
        created_at,
        created_by,
    }
}

/// Maps an optional row to a group, failing with `NotFound` for `None`.
pub(crate) fn require_group(row: Option<GroupRow>, id: GroupId) -> Result<Group, StorageError> {
    row.map(group_from_row)
        .ok_or_else(|| StorageError::not_found("Group", id))
}

pub async fn create(conn: &mut PgConnection, group: &NewGroup) -> Result<Group, StorageError> {
    let row: GroupRow = query_as(
        r#"
        INSERT INTO groups (name, description, created_by)
        VALUES ($1, $2, $3)
        RETURNING id, name, description, created_at, created_by
        "#,
    )
    .bind(&group.name)
    .bind(group.description.as_deref())
    .bind(&group.created_by)
    .fetch_one(conn)
    .await
    .map_err(classify_sqlx_error)?;

    Ok(group_from_row(row))
}

pub async fn get(conn: &mut PgConnection, id: GroupId) -> Result<Group, StorageError> {
    let row: Option<GroupRow> = query_as(
        r#"
        SELECT id, name, description, created_at, created_by
        FROM groups
        WHERE id = $1
        "#,
    )
    .bind(id.0)
    .fetch_optional(conn)
    .await
    .map_err(classify_sqlx_error)?;

    require_group(row, id)
}

pub async fn list(conn: &mut PgConnection) -> Result<Vec<Group>, StorageError> {
    let rows: Vec<GroupRow> = query_as(
        r#"
        SELECT id, name, description, created_at, created_by
        FROM groups
        ORDER BY id
        "#,
    )
    .fetch_all(conn)
    .await
    .map_err(classify_sqlx_error)?;

    Ok(rows.into_iter().map(group_from_row).collect())
}

pub async fn update(
    conn: &mut PgConnection,
    id: GroupId,
    changes: &GroupChanges,
) -> Result<Group, StorageError> {
    let row: Option<GroupRow> = query_as(
        r#"
        UPDATE groups
        SET name = $2, description = $3
        WHERE id = $1
        RETURNING id, name, description, created_at, created_by
        "#,
    )
    .bind(id.0)
    .bind(&changes.name)
    .bind(changes.description.as_deref())
    .fetch_optional(conn)
    .await
    .map_err(classify_sqlx_error)?;

    require_group(row, id)
}

/// Memberships of the group go with it through `ON DELETE CASCADE`.
pub async fn delete(conn: &mut PgConnection, id: GroupId) -> Result<(), StorageError> {
    let result = query("DELETE FROM groups WHERE id = $1")
        .bind(id.0)
        .execute(conn)
        .await
        .map_err(classify_sqlx_error)?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Group", id));
    }
    Ok(())
}

pub async fn delete_all(conn: &mut PgConnection) -> Result<u64, StorageError> {
    let result = query("DELETE FROM groups")
        .execute(conn)
        .await
        .map_err(classify_sqlx_error)?;

    Ok(result.rows_affected())
}

pub async fn exists(conn: &mut PgConnection, id: GroupId) -> Result<bool, StorageError> {
    query_scalar("SELECT EXISTS (SELECT 1 FROM groups WHERE id = $1)")
        .bind(id.0)
        .fetch_one(conn)
        .await
        .map_err(classify_sqlx_error)
}

pub async fn exists_with_name(conn: &mut PgConnection, name: &str) -> Result<bool, StorageError> {
    query_scalar("SELECT EXISTS (SELECT 1 FROM groups WHERE name = $1)")
        .bind(name)
        .fetch_one(conn)
        .await
        .map_err(classify_sqlx_error)
}
