//! In-memory group storage backend for groupkeeper.
//!
//! This crate provides an in-memory implementation of the `GroupStorage`
//! trait from `groupkeeper-storage`. It enforces the same constraints as the
//! PostgreSQL schema, so it doubles as the backend for tests.
//!
//! # Example
//!
//! ```ignore
//! use groupkeeper_db_memory::InMemoryGroupStorage;
//! use groupkeeper_storage::{GroupStorage, NewGroup};
//!
//! let storage = InMemoryGroupStorage::new();
//! let group = storage.create_group(&NewGroup::new("admins", "sys")).await?;
//! ```

mod faults;
mod state;
mod storage;
mod transaction;

pub use faults::FailPoint;
pub use storage::InMemoryGroupStorage;
pub use transaction::InMemoryTransaction;

// Re-export the storage trait for convenience
pub use groupkeeper_storage::{GroupStorage, StorageError};

