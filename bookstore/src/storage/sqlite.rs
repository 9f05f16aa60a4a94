use super::{Filter, Query, Row, RowSequence, Storage, StoredValue};
use crate::error::Result;
use crate::schema::{create_table_sql, drop_table_sql, RowId, SCHEMA_VERSION};
use crate::values::AttributeSet;
use rusqlite::types::{ToSql, ValueRef};
use rusqlite::{Connection, ErrorCode};
use std::ops::Deref;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite-backed storage. One connection, serialized behind a mutex.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Scoped access to the connection. The lock is released when the handle is
/// dropped, on error paths included.
pub struct Handle<'a> {
    conn: MutexGuard<'a, Connection>,
    access: Access,
}

impl Deref for Handle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for Handle<'_> {
    fn drop(&mut self) {
        log::trace!("Released {:?} handle", self.access);
    }
}

impl SqliteStorage {
    /// Open or create the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let storage = SqliteStorage {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    pub fn open_for_read(&self) -> Handle<'_> {
        self.handle(Access::Read)
    }

    pub fn open_for_write(&self) -> Handle<'_> {
        self.handle(Access::Write)
    }

    fn handle(&self, access: Access) -> Handle<'_> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        log::trace!("Acquired {access:?} handle");
        Handle { conn, access }
    }

    /// Version stamped in the database file.
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self.open_for_read();
        let version = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    fn initialize_schema(&self) -> Result<()> {
        let found = self.schema_version()?;
        let conn = self.open_for_write();
        if found == 0 {
            conn.execute_batch(&create_table_sql())?;
            log::info!("Created books table (schema version {SCHEMA_VERSION})");
        } else if found != SCHEMA_VERSION {
            log::info!(
                "Schema version {found} does not match {SCHEMA_VERSION}; dropping and recreating books table"
            );
            conn.execute_batch(&drop_table_sql())?;
            conn.execute_batch(&create_table_sql())?;
        } else {
            conn.execute_batch(&create_table_sql())?;
        }
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn query(&self, table: &str, query: &Query) -> Result<RowSequence> {
        let columns = query.columns();
        let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
        let mut sql = format!("SELECT {} FROM {}", names.join(", "), quote_ident(table));
        if let Some(expr) = query.filter.expr() {
            sql.push_str(&format!(" WHERE {expr}"));
        }
        if !query.order.is_empty() {
            let order: Vec<String> = query.order.iter().map(ToString::to_string).collect();
            sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
        }
        log::debug!("query: {sql}");

        let conn = self.open_for_read();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(query.filter.args()),
            |row| {
                let mut values = Vec::with_capacity(columns.len());
                for (i, column) in columns.iter().enumerate() {
                    values.push((*column, stored_value(row.get_ref(i)?)));
                }
                Ok(Row::new(values))
            },
        )?;
        let rows = rows.collect::<rusqlite::Result<Vec<Row>>>()?;
        Ok(RowSequence::new(rows))
    }

    fn insert(&self, table: &str, attrs: &AttributeSet) -> Result<Option<RowId>> {
        let sql = if attrs.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table))
        } else {
            let names: Vec<&str> = attrs.iter().map(|(f, _)| f.as_str()).collect();
            let placeholders = vec!["?"; names.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                quote_ident(table),
                names.join(", ")
            )
        };
        log::debug!("insert: {sql}");

        let conn = self.open_for_write();
        let params: Vec<&dyn ToSql> = attrs.iter().map(|(_, v)| v as &dyn ToSql).collect();
        match conn.execute(&sql, params.as_slice()) {
            Ok(_) => Ok(Some(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                log::warn!(
                    "Row rejected by {table}: {}",
                    msg.unwrap_or_else(|| e.to_string())
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update(&self, table: &str, attrs: &AttributeSet, filter: &Filter) -> Result<usize> {
        if attrs.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> = attrs
            .iter()
            .map(|(f, _)| format!("{} = ?", f.as_str()))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", quote_ident(table), assignments.join(", "));
        if let Some(expr) = filter.expr() {
            sql.push_str(&format!(" WHERE {expr}"));
        }
        log::debug!("update: {sql}");

        let mut params: Vec<&dyn ToSql> = attrs.iter().map(|(_, v)| v as &dyn ToSql).collect();
        params.extend(filter.args().iter().map(|a| a as &dyn ToSql));

        let conn = self.open_for_write();
        let count = conn.execute(&sql, params.as_slice())?;
        Ok(count)
    }

    fn delete(&self, table: &str, filter: &Filter) -> Result<usize> {
        let mut sql = format!("DELETE FROM {}", quote_ident(table));
        if let Some(expr) = filter.expr() {
            sql.push_str(&format!(" WHERE {expr}"));
        }
        log::debug!("delete: {sql}");

        let conn = self.open_for_write();
        let count = conn.execute(&sql, rusqlite::params_from_iter(filter.args()))?;
        Ok(count)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn stored_value(value: ValueRef<'_>) -> StoredValue {
    match value {
        ValueRef::Null => StoredValue::Null,
        ValueRef::Integer(n) => StoredValue::Integer(n),
        // Only integer and text are ever written; anything else is shown as text
        ValueRef::Real(r) => StoredValue::Text(r.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            StoredValue::Text(String::from_utf8_lossy(t).into_owned())
        }
    }
}
