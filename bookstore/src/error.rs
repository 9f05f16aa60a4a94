use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum BookStoreError {
    #[error("{operation} is not supported for {locator}")]
    UnsupportedLocator {
        operation: &'static str,
        locator: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to insert row for {locator}")]
    InsertFailed { locator: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid sort order: {0}")]
    InvalidOrder(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, BookStoreError>;
