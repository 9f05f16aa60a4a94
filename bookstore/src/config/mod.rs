use crate::error::{BookStoreError, Result};
use crate::locator::DEFAULT_AUTHORITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional configuration file inside a data directory.
pub const CONFIG_FILE: &str = "bookstore.yaml";

/// Database file name used when none is configured.
pub const DEFAULT_DATABASE: &str = "bookStore.db";

pub const AUTHORITY_ENV: &str = "BOOKSTORE_AUTHORITY";
pub const DATABASE_ENV: &str = "BOOKSTORE_DATABASE";

/// Settings for opening a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Locator prefix, e.g. `content://com.example.android.books`.
    pub authority: String,
    /// Database file, relative to the data directory unless absolute.
    pub database: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            authority: DEFAULT_AUTHORITY.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Load `bookstore.yaml` from `data_dir` if present, then apply
    /// environment overrides.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let config = if path.exists() {
            log::debug!("Reading configuration from {}", path.display());
            parse_config(&path)?
        } else {
            ProviderConfig::default()
        };
        config
            .with_overrides(|key| std::env::var(key).ok())
            .validated()
    }

    /// Apply overrides looked up by environment variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(authority) = lookup(AUTHORITY_ENV) {
            self.authority = authority;
        }
        if let Some(database) = lookup(DATABASE_ENV) {
            self.database = database;
        }
        self
    }

    fn validated(self) -> Result<Self> {
        if self.authority.trim().is_empty() {
            return Err(BookStoreError::Config("authority must not be empty".into()));
        }
        if self.database.trim().is_empty() {
            return Err(BookStoreError::Config("database must not be empty".into()));
        }
        Ok(self)
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        let database = Path::new(&self.database);
        if database.is_absolute() {
            database.to_path_buf()
        } else {
            data_dir.join(database)
        }
    }
}

/// Parse a configuration file.
pub fn parse_config(path: &Path) -> Result<ProviderConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<ProviderConfig> {
    // An empty file is a valid, all-defaults configuration
    if content.trim().is_empty() {
        return Ok(ProviderConfig::default());
    }
    let config: ProviderConfig = serde_yaml::from_str(content)?;
    Ok(config)
}
