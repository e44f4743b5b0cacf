use std::sync::Arc;

use groupkeeper_db_memory::InMemoryGroupStorage;
use groupkeeper_db_postgres::PostgresGroupStorage;
use groupkeeper_storage::{DynGroupStorage, StorageError};
use tracing::info;

use crate::config::{StorageBackend, StorageSettings};

/// Create a storage instance based on the provided settings.
///
/// The PostgreSQL backend opens its pool and, if enabled, runs migrations
/// before returning.
///
/// # Errors
///
/// Returns `StorageError::Connection` if the database cannot be reached and
/// `StorageError::Internal` if migrations fail.
pub async fn create_storage(settings: &StorageSettings) -> Result<DynGroupStorage, StorageError> {
    let storage: DynGroupStorage = match settings.backend {
        StorageBackend::Memory => Arc::new(InMemoryGroupStorage::new()),
        StorageBackend::Postgres => {
            Arc::new(PostgresGroupStorage::new(settings.postgres.clone()).await?)
        }
    };
    info!(backend = storage.backend_name(), "Storage backend ready");
    Ok(storage)
}
