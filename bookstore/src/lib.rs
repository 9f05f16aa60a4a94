pub mod schema;
pub mod values;
pub mod locator;
pub mod validation;
pub mod storage;
pub mod notify;
pub mod provider;
pub mod config;
pub mod error;

pub use config::ProviderConfig;
pub use error::{BookStoreError, Result};
pub use locator::{LocatorMatcher, Scope};
pub use provider::BookProvider;
pub use schema::{Book, Column, Field, RowId};
pub use storage::{Filter, Query, RowSequence, SqliteStorage, Storage};
pub use values::{AttrValue, AttributeSet};
