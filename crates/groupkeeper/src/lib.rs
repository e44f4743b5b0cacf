//! Group and membership store.
//!
//! Wires the layered configuration, tracing and the configured storage backend
//! into a [`Groupkeeper`] handle exposing the storage gateway and the
//! membership reconciler.
//!
//! # Example
//!
//! ```ignore
//! use groupkeeper::Groupkeeper;
//! use groupkeeper::storage::{GroupId, MembershipKey, NewMember, UserId};
//!
//! # async fn example() -> Result<(), groupkeeper::Error> {
//! let app = Groupkeeper::load(None).await?;
//! app.reconciler()
//!     .reconcile(
//!         GroupId(1),
//!         &[NewMember::owner(UserId(11))],
//!         &[MembershipKey::new(GroupId(1), UserId(10))],
//!         "sys",
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod factory;
pub mod observability;

use std::path::Path;

pub use config::{AppConfig, ConfigError, LoggingConfig, StorageBackend, StorageSettings};
pub use factory::create_storage;
pub use groupkeeper_storage as storage;
pub use groupkeeper_storage::{DynGroupStorage, GroupMembershipReconciler, StorageError};

/// Errors raised while bringing the store up or using it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A configured store: the gateway plus a reconciler bound to it.
#[derive(Clone, Debug)]
pub struct Groupkeeper {
    config: AppConfig,
    reconciler: GroupMembershipReconciler,
}

impl Groupkeeper {
    /// Loads `.env` and the configuration, installs tracing at the configured
    /// level, then opens the storage backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for unreadable or invalid configuration and
    /// `Error::Storage` if the backend cannot be opened.
    pub async fn load(path: Option<&Path>) -> Result<Self, Error> {
        config::load_dotenv();
        let config = config::load_config(path)?;
        observability::init_tracing_with_level(&config.logging.level);
        Ok(Self::from_config(config).await?)
    }

    /// Opens the storage backend named by an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the database cannot be reached.
    pub async fn from_config(config: AppConfig) -> Result<Self, StorageError> {
        let storage = create_storage(&config.storage).await?;
        Ok(Self {
            config,
            reconciler: GroupMembershipReconciler::new(storage),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn storage(&self) -> &DynGroupStorage {
        self.reconciler.storage()
    }

    #[must_use]
    pub fn reconciler(&self) -> &GroupMembershipReconciler {
        &self.reconciler
    }
}
