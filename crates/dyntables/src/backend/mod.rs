//! Database backends.
//!
//! This module provides the storage seam under [`DynamicTables`]:
//!
//! - `Backend` trait: the statements and catalog lookups the core issues
//! - `PgBackend`: one `tokio-postgres` connection for production use
//! - `MemoryBackend`: an in-process table store for testing
//!
//! Every method takes `&mut self`; a backend is one connection and is never
//! shared between concurrent operations.
//!
//! # Transactions
//!
//! Backends start in auto-commit mode, where every statement commits on its
//! own. `set_auto_commit(false)` opens an explicit transaction that lasts
//! until `commit` or `rollback`. Turning auto-commit back on discards any
//! transaction that is still open.
//!
//! [`DynamicTables`]: crate::DynamicTables

mod memory;
mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

use std::future::Future;
use std::pin::Pin;

use crate::error::TableResult;
use crate::row::RowData;
use crate::schema::ColumnDefinition;
use crate::value::Value;

/// Boxed future returned by backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = TableResult<T>> + Send + 'a>>;

/// A column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Data type as the database reports it.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a column description.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Trait for relational backends.
pub trait Backend: Send {
    /// Creates `table` with a serial `id` key and `columns`, unless it exists.
    fn create_table<'a>(
        &'a mut self,
        table: &'a str,
        columns: &'a [ColumnDefinition],
    ) -> BackendFuture<'a, ()>;

    /// Inserts one row and returns the number of rows affected.
    ///
    /// `columns` are the declared columns the row was built against; they
    /// decide how each value is bound.
    fn insert_row<'a>(
        &'a mut self,
        table: &'a str,
        columns: &'a [ColumnDefinition],
        row: &'a RowData,
    ) -> BackendFuture<'a, u64>;

    /// Drops `table` and its dependent objects, if it exists.
    fn drop_table<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, ()>;

    /// Lists every base table in the catalog schema.
    fn list_tables(&mut self) -> BackendFuture<'_, Vec<String>>;

    /// Lists the tables whose name matches a SQL `LIKE` pattern.
    fn tables_like<'a>(&'a mut self, pattern: &'a str) -> BackendFuture<'a, Vec<String>>;

    /// Lists the columns of `table` in ordinal order.
    fn list_columns<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, Vec<ColumnInfo>>;

    /// Returns every row of `table`, `id` first.
    fn fetch_rows<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, Vec<Vec<Value>>>;

    /// Enables or disables auto-commit.
    fn set_auto_commit(&mut self, enabled: bool) -> BackendFuture<'_, ()>;

    /// Commits the open transaction.
    fn commit(&mut self) -> BackendFuture<'_, ()>;

    /// Rolls back the open transaction.
    fn rollback(&mut self) -> BackendFuture<'_, ()>;

    /// Returns true if auto-commit is enabled.
    fn auto_commit(&self) -> bool;

    /// Closes the connection. Later calls fail with `ConnectionClosed`.
    fn close(&mut self) -> BackendFuture<'_, ()>;
}
