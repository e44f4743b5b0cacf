use groupkeeper_storage::{StorageError, User, UserId};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgConnection;
use time::OffsetDateTime;

use crate::error::classify_sqlx_error;

pub async fn create(conn: &mut PgConnection, username: &str) -> Result<User, StorageError> {
    let (id, username, created_at): (i64, String, OffsetDateTime) = query_as(
        r#"
        INSERT INTO users (username)
        VALUES ($1)
        RETURNING id, username, created_at
        "#,
    )
    .bind(username)
    .fetch_one(conn)
    .await
    .map_err(classify_sqlx_error)?;

    Ok(User {
        id: UserId(id),
        username,
        created_at,
    })
}
