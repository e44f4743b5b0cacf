//! PostgreSQL storage implementation.

use async_trait::async_trait;
use sqlx_core::pool::PoolConnection;
use sqlx_postgres::{PgPool, Postgres};
use tracing::instrument;

use groupkeeper_storage::{
    Group, GroupChanges, GroupId, GroupMembership, GroupStorage, GroupTransaction, NewGroup,
    StorageError, User,
};

use crate::config::PostgresConfig;
use crate::error::classify_sqlx_error;
use crate::transaction::PostgresTransaction;
use crate::{migrations, pool, queries};

/// PostgreSQL storage backend for groups and memberships.
///
/// Gateway calls each run on a pooled connection in autocommit mode.
/// Multi-statement work goes through [`GroupStorage::begin_transaction`].
#[derive(Debug, Clone)]
pub struct PostgresGroupStorage {
    pool: PgPool,
}

impl PostgresGroupStorage {
    /// Creates a new `PostgresGroupStorage` with the given configuration.
    ///
    /// This will create a connection pool and optionally run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created or
    /// if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Creates a new `PostgresGroupStorage` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn acquire(&self) -> Result<PoolConnection<Postgres>, StorageError> {
        self.pool.acquire().await.map_err(classify_sqlx_error)
    }
}

#[async_trait]
impl GroupStorage for PostgresGroupStorage {
    async fn begin_transaction(&self) -> Result<Box<dyn GroupTransaction>, StorageError> {
        let tx = self.pool.begin().await.map_err(classify_sqlx_error)?;
        Ok(Box::new(PostgresTransaction::new(tx)))
    }

    #[instrument(skip(self, group), fields(name = %group.name))]
    async fn create_group(&self, group: &NewGroup) -> Result<Group, StorageError> {
        let mut conn = self.acquire().await?;
        queries::groups::create(&mut conn, group).await
    }

    async fn get_group(&self, id: GroupId) -> Result<Group, StorageError> {
        let mut conn = self.acquire().await?;
        queries::groups::get(&mut conn, id).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        let mut conn = self.acquire().await?;
        queries::groups::list(&mut conn).await
    }

    #[instrument(skip(self, changes))]
    async fn update_group(
        &self,
        id: GroupId,
        changes: &GroupChanges,
    ) -> Result<Group, StorageError> {
        let mut conn = self.acquire().await?;
        queries::groups::update(&mut conn, id, changes).await
    }

    #[instrument(skip(self))]
    async fn delete_group(&self, id: GroupId) -> Result<(), StorageError> {
        let mut conn = self.acquire().await?;
        queries::groups::delete(&mut conn, id).await
    }

    #[instrument(skip(self))]
    async fn delete_all_groups(&self) -> Result<u64, StorageError> {
        let mut conn = self.acquire().await?;
        queries::groups::delete_all(&mut conn).await
    }

    async fn group_exists(&self, id: GroupId) -> Result<bool, StorageError> {
        let mut conn = self.acquire().await?;
        queries::groups::exists(&mut conn, id).await
    }

    async fn group_exists_with_name(&self, name: &str) -> Result<bool, StorageError> {
        let mut conn = self.acquire().await?;
        queries::groups::exists_with_name(&mut conn, name).await
    }

    async fn list_memberships(
        &self,
        group_ids: &[GroupId],
    ) -> Result<Vec<GroupMembership>, StorageError> {
        let mut conn = self.acquire().await?;
        queries::memberships::list_for_groups(&mut conn, group_ids).await
    }

    async fn create_user(&self, username: &str) -> Result<User, StorageError> {
        let mut conn = self.acquire().await?;
        queries::users::create(&mut conn, username).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
