pub mod types;

pub use types::*;

use serde::{Deserialize, Serialize};

/// Label shown for a book whose category is absent or empty.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// A fully loaded book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub price: i64,
    pub quantity: i64,
    pub supplier_name: String,
    pub supplier_phone: i64,
}

impl Book {
    /// Category as it should be displayed. Presentation only: the stored
    /// value is left untouched.
    pub fn category_label(&self) -> &str {
        category_label(self.category.as_deref())
    }
}

pub fn category_label(category: Option<&str>) -> &str {
    match category {
        Some(c) if !c.is_empty() => c,
        _ => UNKNOWN_CATEGORY,
    }
}

/// `CREATE TABLE IF NOT EXISTS` statement for the books table.
pub fn create_table_sql() -> String {
    let columns: Vec<String> = COLUMNS.iter().map(ColumnDefinition::to_sql).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE_NAME} ({});",
        columns.join(", ")
    )
}

pub fn drop_table_sql() -> String {
    format!("DROP TABLE IF EXISTS {TABLE_NAME};")
}
