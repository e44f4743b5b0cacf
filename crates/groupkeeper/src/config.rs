//! Layered application configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file
//! (`groupkeeper.toml` unless a path is given), then `GROUPKEEPER__*`
//! environment variables with `__` between nesting levels, e.g.
//! `GROUPKEEPER__STORAGE__POSTGRES__POOL_SIZE=20`.

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};
use groupkeeper_db_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "groupkeeper.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "GROUPKEEPER";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("config load error: {0}")]
    Load(#[from] ::config::ConfigError),

    /// The merged configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Checks cross-field constraints the types cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(ConfigError::Invalid(format!(
                "logging.level '{}' is not a valid filter directive",
                self.logging.level
            )));
        }

        if self.storage.backend == StorageBackend::Postgres {
            let pg = &self.storage.postgres;
            if !(pg.url.starts_with("postgres://") || pg.url.starts_with("postgresql://")) {
                return Err(ConfigError::Invalid(
                    "storage.postgres.url must start with postgres:// or postgresql://".into(),
                ));
            }
            if pg.pool_size == 0 {
                return Err(ConfigError::Invalid(
                    "storage.postgres.pool_size must be > 0".into(),
                ));
            }
            if pg.min_connections.is_some_and(|min| min > pg.pool_size) {
                return Err(ConfigError::Invalid(
                    "storage.postgres.min_connections must not exceed pool_size".into(),
                ));
            }
            if pg.connect_timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "storage.postgres.connect_timeout_ms must be > 0".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Which gateway implementation backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local storage; contents are lost on exit.
    #[default]
    Memory,
    /// PostgreSQL through a connection pool.
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Only read when `backend = "postgres"`.
    #[serde(default)]
    pub postgres: PostgresConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Loads `.env` into the process environment if the file exists.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        tracing::warn!(error = %e, "Failed to load .env file");
    }
}

/// Loads, merges and validates the configuration.
///
/// A missing file is not an error; defaults and environment overrides still
/// apply.
///
/// # Errors
///
/// Returns `ConfigError::Load` if a source is malformed and
/// `ConfigError::Invalid` if validation fails.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with_prefix(path, ENV_PREFIX)
}

fn load_config_with_prefix(path: Option<&Path>, prefix: &str) -> Result<AppConfig, ConfigError> {
    let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);

    let mut builder = Config::builder();
    if path.exists() {
        builder = builder.add_source(File::from(path));
    }
    builder = builder.add_source(
        Environment::with_prefix(prefix)
            .try_parsing(true)
            .separator("__"),
    );

    let merged: AppConfig = builder.build()?.try_deserialize()?;
    merged.validate()?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("failed to create temp file");
        file.write_all(contents.as_bytes())
            .expect("failed to write config");
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            load_config_with_prefix(Some(&dir.path().join("absent.toml")), "GK_TEST_DEFAULTS")
                .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.storage.postgres.pool_size, 10);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [storage]
            backend = "postgres"

            [storage.postgres]
            url = "postgres://groupkeeper:secret@db:5432/groups"
            pool_size = 20
            run_migrations = false

            [logging]
            level = "debug"
            "#,
        );

        let config = load_config_with_prefix(Some(file.path()), "GK_TEST_FILE").unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(
            config.storage.postgres.url,
            "postgres://groupkeeper:secret@db:5432/groups"
        );
        assert_eq!(config.storage.postgres.pool_size, 20);
        assert!(!config.storage.postgres.run_migrations);
        assert_eq!(config.storage.postgres.connect_timeout_ms, 5000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(
            r#"
            [logging]
            level = "debug"
            "#,
        );
        // SAFETY: the prefix is unique to this test, no other thread reads it.
        unsafe {
            std::env::set_var("GK_TEST_ENV__LOGGING__LEVEL", "warn");
        }

        let config = load_config_with_prefix(Some(file.path()), "GK_TEST_ENV").unwrap();

        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let file = write_config(
            r#"
            [storage]
            backend = "sqlite"
            "#,
        );

        let err = load_config_with_prefix(Some(file.path()), "GK_TEST_BACKEND").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_validate_postgres_settings() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Postgres;
        assert!(config.validate().is_ok());

        config.storage.postgres.url = "mysql://localhost/groups".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.storage.postgres.url = "postgresql://localhost/groups".into();
        config.storage.postgres.pool_size = 2;
        config.storage.postgres.min_connections = Some(5);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_connections"));
    }

    #[test]
    fn test_memory_backend_ignores_postgres_settings() {
        let mut config = AppConfig::default();
        config.storage.postgres.pool_size = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut config = AppConfig::default();
        config.logging.level = "groupkeeper=loud".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
