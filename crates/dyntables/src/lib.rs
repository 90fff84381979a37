//! # dyntables
//!
//! Route rows into PostgreSQL tables named after a column value.
//!
//! A [`DynamicTables`] manager holds a column layout, the name of one
//! "dynamic" column and a table prefix. Each row handed to
//! [`DynamicTables::input`] lands in `prefix + sanitize(value)`, where `value`
//! is the row's dynamic-column value. Missing tables are created on the fly
//! with `CREATE TABLE IF NOT EXISTS`. Every table carrying the prefix can be
//! dropped in one transaction with [`DynamicTables::delete_tables`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dyntables::{ConnectionConfig, DynamicTables};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::from_env()?;
//!     let mut tables = DynamicTables::connect(&config).await?;
//!
//!     tables.set_table_prefix("dt1_");
//!     tables.set_columns("domain VARCHAR(100), keyword VARCHAR(100), language VARCHAR(100)");
//!     tables.set_dynamic_column("domain");
//!
//!     // lands in dt1_wikipediaorg
//!     tables.input(["wikipedia.org", "cats", "en"]).await;
//!
//!     let report = tables.try_delete_tables().await?;
//!     println!("dropped {} tables", report.count());
//!
//!     tables.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a server
//!
//! [`MemoryBackend`] implements the same [`Backend`] trait in process, with
//! snapshot transactions and injectable failures.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Database backends.
pub mod backend;

/// Connection settings.
pub mod config;

/// Error types.
pub mod error;

/// Row payloads.
pub mod row;

/// Identifier sanitization.
pub mod sanitize;

/// Column layout.
pub mod schema;

/// SQL statement rendering.
pub mod sql;

/// The table manager.
pub mod tables;

/// Cell values.
pub mod value;

pub use backend::{Backend, ColumnInfo, MemoryBackend, PgBackend};
pub use config::ConnectionConfig;
pub use error::{ErrorKind, TableError, TableResult};
pub use row::RowData;
pub use schema::{ColumnDefinition, ColumnSet, LayoutConfig, DEFAULT_TABLE_PREFIX};
pub use tables::{DynamicTables, EvictionReport, InsertOutcome, TableStats};
pub use value::Value;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
