//! # configs
//!
//! Layered runtime settings for the ZSki binary.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. an optional `zski.toml` (or `.yaml`/`.json`) in the working directory
//! 3. `ZSKI__SECTION__KEY` environment variables (a `.env` file is read first)
//! 4. a plain `DATABASE_URL`, the name every hosting provider hands out

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("unsupported database url scheme (expected postgres:// or sqlite:): {0}")]
    UnknownDatabaseScheme(String),

    #[error("storage.backend is \"s3\" but the [storage.s3] section is missing")]
    MissingS3Settings,

    #[error("storage.local.url_prefix must start with '/' and name a path below the root: {0:?}")]
    InvalidUrlPrefix(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Request body cap for uploads. Unset means unlimited.
    #[serde(default)]
    pub upload_limit_bytes: Option<usize>,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

impl DatabaseSettings {
    /// Picks the backend from the URL scheme.
    pub fn backend(&self) -> Result<DatabaseBackend, SettingsError> {
        let url = self.url.expose_secret();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DatabaseBackend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(DatabaseBackend::Sqlite)
        } else {
            let scheme = url.split(':').next().unwrap_or_default();
            Err(SettingsError::UnknownDatabaseScheme(scheme.to_string()))
        }
    }
}

/// Where uploaded images go. One strategy per deployment; rows written
/// under one strategy are not migrated to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Inline,
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub local: LocalStorageSettings,
    #[serde(default)]
    pub s3: Option<S3Settings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageSettings {
    pub root: PathBuf,
    pub url_prefix: String,
}

impl LocalStorageSettings {
    /// `url_prefix` without its trailing slashes, as uploads are served under it.
    pub fn mount_path(&self) -> &str {
        self.url_prefix.trim_end_matches('/')
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !self.url_prefix.starts_with('/') || self.mount_path().is_empty() {
            return Err(SettingsError::InvalidUrlPrefix(self.url_prefix.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub public_url: String,
}

impl Settings {
    /// Reads `.env`, then every source listed in the module docs.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let builder = defaults()?
            .add_source(File::with_name("zski").required(false))
            .add_source(
                Environment::with_prefix("ZSKI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?;

        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        debug!(
            storage = ?settings.storage.backend,
            database = ?settings.database.backend()?,
            "settings loaded"
        );
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        self.database.backend()?;
        if self.storage.backend == StorageBackend::S3 && self.storage.s3.is_none() {
            return Err(SettingsError::MissingS3Settings);
        }
        if self.storage.backend == StorageBackend::Local {
            self.storage.local.validate()?;
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("database.url", "postgres://localhost/zski")?
        .set_default("database.max_connections", 5)?
        .set_default("storage.backend", "inline")?
        .set_default("storage.local.root", "./data/uploads")?
        .set_default("storage.local.url_prefix", "/uploads")
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings, SettingsError> {
        Settings::build(defaults().unwrap().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn defaults_are_complete() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings.server.address(), "0.0.0.0:3000");
        assert_eq!(settings.server.upload_limit_bytes, None);
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.database.backend().unwrap(), DatabaseBackend::Postgres);
        assert_eq!(settings.storage.backend, StorageBackend::Inline);
        assert_eq!(settings.storage.local.url_prefix, "/uploads");
        assert!(settings.storage.s3.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = from_toml(
            r#"
            [server]
            port = 8080
            upload_limit_bytes = 10485760

            [database]
            url = "sqlite:zski.db"

            [storage]
            backend = "s3"

            [storage.s3]
            bucket = "zski-photos"
            region = "us-east-1"
            public_url = "https://zski-photos.s3.amazonaws.com"
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.upload_limit_bytes, Some(10 * 1024 * 1024));
        assert_eq!(settings.database.backend().unwrap(), DatabaseBackend::Sqlite);
        assert_eq!(settings.storage.backend, StorageBackend::S3);
        let s3 = settings.storage.s3.unwrap();
        assert_eq!(s3.bucket, "zski-photos");
        assert_eq!(s3.endpoint, None);
    }

    #[test]
    fn s3_backend_requires_its_section() {
        let err = from_toml("[storage]\nbackend = \"s3\"").unwrap_err();
        assert!(matches!(err, SettingsError::MissingS3Settings));
    }

    #[test]
    fn local_url_prefix_must_be_a_rooted_subpath() {
        for prefix in ["uploads", "/", "//", ""] {
            let toml = format!("[storage]\nbackend = \"local\"\n[storage.local]\nroot = \"./data\"\nurl_prefix = \"{prefix}\"");
            let err = from_toml(&toml).unwrap_err();
            assert!(matches!(err, SettingsError::InvalidUrlPrefix(ref p) if p == prefix), "{prefix:?}");
        }

        let settings = from_toml("[storage]\nbackend = \"local\"\n[storage.local]\nroot = \"./data\"\nurl_prefix = \"/media/\"").unwrap();
        assert_eq!(settings.storage.local.mount_path(), "/media");

        // Only checked when the local backend is selected.
        assert!(from_toml("[storage.local]\nroot = \"./data\"\nurl_prefix = \"/\"").is_ok());
    }

    #[test]
    fn unknown_database_scheme_is_rejected() {
        let err = from_toml("[database]\nurl = \"mysql://localhost/zski\"").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported database url scheme (expected postgres:// or sqlite:): mysql"
        );
    }

    #[test]
    fn database_url_is_redacted_in_debug_output() {
        let settings = from_toml("[database]\nurl = \"postgres://zski:hunter2@db/zski\"").unwrap();
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
