use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the single table holding book records.
pub const TABLE_NAME: &str = "books";

/// Version stamped into the database file. Opening a file stamped with any
/// other version drops the table and recreates it empty.
pub const SCHEMA_VERSION: i32 = 4;

/// Row id assigned by the storage engine. Never negative.
pub type RowId = i64;

/// Caller-writable fields of a book record.
///
/// Declaration order is the table's column order and the iteration order of
/// an [`AttributeSet`](crate::values::AttributeSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Category,
    Price,
    Quantity,
    SupplierName,
    SupplierPhone,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Name,
        Field::Category,
        Field::Price,
        Field::Quantity,
        Field::SupplierName,
        Field::SupplierPhone,
    ];

    /// The column identifier used in storage and in attribute-set keys.
    pub fn as_str(self) -> &'static str {
        Column::from(self).as_str()
    }

    /// Resolve an attribute-set key. `id` is not a field: it is never writable.
    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == key)
    }

    pub fn storage_type(self) -> StorageType {
        Column::from(self).definition().storage
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every column of the table: the system-assigned `id` plus each [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    Name,
    Category,
    Price,
    Quantity,
    SupplierName,
    SupplierPhone,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Id,
        Column::Name,
        Column::Category,
        Column::Price,
        Column::Quantity,
        Column::SupplierName,
        Column::SupplierPhone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Name => "name",
            Column::Category => "category",
            Column::Price => "price",
            Column::Quantity => "quantity",
            Column::SupplierName => "supplier_name",
            Column::SupplierPhone => "supplier_phone",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// The writable field behind this column, `None` for `id`.
    pub fn field(self) -> Option<Field> {
        match self {
            Column::Id => None,
            Column::Name => Some(Field::Name),
            Column::Category => Some(Field::Category),
            Column::Price => Some(Field::Price),
            Column::Quantity => Some(Field::Quantity),
            Column::SupplierName => Some(Field::SupplierName),
            Column::SupplierPhone => Some(Field::SupplierPhone),
        }
    }

    pub fn definition(self) -> &'static ColumnDefinition {
        &COLUMNS[self as usize]
    }
}

impl From<Field> for Column {
    fn from(field: Field) -> Self {
        match field {
            Field::Name => Column::Name,
            Field::Category => Column::Category,
            Field::Price => Column::Price,
            Field::Quantity => Column::Quantity,
            Field::SupplierName => Column::SupplierName,
            Field::SupplierPhone => Column::SupplierPhone,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Integer,
    Text,
}

impl StorageType {
    pub fn sql_name(self) -> &'static str {
        match self {
            StorageType::Integer => "INTEGER",
            StorageType::Text => "TEXT",
        }
    }
}

/// Definition of a single column of the books table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub column: Column,
    pub storage: StorageType,
    pub primary_key: bool,
    pub not_null: bool,
    pub default: Option<i64>,
}

/// Column definitions in table order. Indexed by `Column as usize`.
pub static COLUMNS: [ColumnDefinition; 7] = [
    ColumnDefinition {
        column: Column::Id,
        storage: StorageType::Integer,
        primary_key: true,
        not_null: false,
        default: None,
    },
    ColumnDefinition {
        column: Column::Name,
        storage: StorageType::Text,
        primary_key: false,
        not_null: true,
        default: None,
    },
    ColumnDefinition {
        column: Column::Category,
        storage: StorageType::Text,
        primary_key: false,
        not_null: false,
        default: None,
    },
    ColumnDefinition {
        column: Column::Price,
        storage: StorageType::Integer,
        primary_key: false,
        not_null: true,
        default: Some(0),
    },
    ColumnDefinition {
        column: Column::Quantity,
        storage: StorageType::Integer,
        primary_key: false,
        not_null: true,
        default: Some(0),
    },
    ColumnDefinition {
        column: Column::SupplierName,
        storage: StorageType::Text,
        primary_key: false,
        not_null: true,
        default: None,
    },
    ColumnDefinition {
        column: Column::SupplierPhone,
        storage: StorageType::Integer,
        primary_key: false,
        not_null: false,
        default: Some(0),
    },
];

impl ColumnDefinition {
    /// Render the column clause of a `CREATE TABLE` statement.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.column.as_str(), self.storage.sql_name());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            sql.push_str(&format!(" DEFAULT {default}"));
        }
        sql
    }
}
