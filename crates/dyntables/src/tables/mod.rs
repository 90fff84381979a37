//! The dynamic table manager.
//!
//! [`DynamicTables`] owns one backend connection and one [`LayoutConfig`].
//! Runtime operations come in two flavors:
//!
//! - `try_*` methods return a [`TableResult`] and leave the decision to the
//!   caller.
//! - The plain methods are best-effort: failures are logged and counted in
//!   [`TableStats`], and a batch of rows keeps going past a bad one.

mod eviction;
mod router;

pub use eviction::EvictionReport;

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::backend::{Backend, ColumnInfo, MemoryBackend, PgBackend};
use crate::config::ConnectionConfig;
use crate::error::{TableError, TableResult};
use crate::row::RowData;
use crate::sanitize;
use crate::schema::{ColumnDefinition, ColumnSet, LayoutConfig};
use crate::value::Value;

/// Result of a single insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Target table.
    pub table: String,
    /// Rows reported by the database.
    pub rows_affected: u64,
}

/// Counters describing what a manager has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Successful `CREATE TABLE IF NOT EXISTS` statements.
    pub tables_ensured: u64,
    /// Failed table creations.
    pub create_failures: u64,
    /// Rows inserted.
    pub rows_inserted: u64,
    /// Failed inserts.
    pub insert_failures: u64,
    /// Rows rejected before reaching the database.
    pub rejected_rows: u64,
    /// Committed bulk deletes.
    pub evictions_committed: u64,
    /// Rolled back bulk deletes.
    pub evictions_rolled_back: u64,
    /// Tables removed by committed bulk deletes.
    pub tables_dropped: u64,
}

/// Routes rows into tables named after their dynamic-column value.
pub struct DynamicTables<B: Backend> {
    backend: B,
    layout: Arc<LayoutConfig>,
    stats: TableStats,
}

impl DynamicTables<PgBackend> {
    /// Connects to PostgreSQL.
    pub async fn connect(config: &ConnectionConfig) -> TableResult<Self> {
        Ok(Self::new(PgBackend::connect(config).await?))
    }
}

impl DynamicTables<MemoryBackend> {
    /// Creates a manager over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: Backend> DynamicTables<B> {
    /// Creates a manager with the default layout.
    pub fn new(backend: B) -> Self {
        Self::with_layout(backend, LayoutConfig::default())
    }

    /// Creates a manager with the given layout.
    pub fn with_layout(backend: B, layout: LayoutConfig) -> Self {
        Self {
            backend,
            layout: Arc::new(layout),
            stats: TableStats::default(),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Returns the active layout.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Replaces the whole layout.
    pub fn set_layout(&mut self, layout: LayoutConfig) {
        self.layout = Arc::new(layout);
    }

    /// Replaces the column list, skipping malformed entries with a warning.
    pub fn set_columns(&mut self, spec: &str) {
        let columns = ColumnSet::parse(spec);
        self.set_layout(self.layout.with_columns(columns));
    }

    /// Replaces the column list, failing on the first malformed entry.
    ///
    /// The current columns are kept when this returns an error.
    pub fn try_set_columns(&mut self, spec: &str) -> TableResult<()> {
        let columns = ColumnSet::parse_strict(spec)?;
        self.set_layout(self.layout.with_columns(columns));
        Ok(())
    }

    /// Sets the column whose value selects the table. Not validated here.
    pub fn set_dynamic_column(&mut self, name: &str) {
        self.set_layout(self.layout.with_dynamic_column(name));
    }

    /// Sets the prefix used for naming and for bulk deletion.
    pub fn set_table_prefix(&mut self, prefix: &str) {
        self.set_layout(self.layout.with_table_prefix(prefix));
    }

    /// `prefix + sanitize(raw)`.
    pub fn format_table_name(&self, raw: &str) -> String {
        self.layout.format_table_name(raw)
    }

    /// Library version.
    pub fn version() -> &'static str {
        crate::VERSION
    }

    /// Returns the counters.
    pub fn stats(&self) -> &TableStats {
        &self.stats
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the backend mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Closes the connection.
    pub async fn close(&mut self) -> TableResult<()> {
        self.backend.close().await
    }

    /// Consumes the manager, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    // =========================================================================
    // Table creation
    // =========================================================================

    /// Creates `table` with `columns` unless it already exists.
    pub async fn try_ensure_table(
        &mut self,
        table: &str,
        columns: &[ColumnDefinition],
    ) -> TableResult<()> {
        info!("attempting to create table: {}", table);
        match self.backend.create_table(table, columns).await {
            Ok(()) => {
                self.stats.tables_ensured += 1;
                info!("table ready: {}", table);
                Ok(())
            }
            Err(e) => {
                self.stats.create_failures += 1;
                Err(e)
            }
        }
    }

    /// Best-effort [`DynamicTables::try_ensure_table`].
    pub async fn ensure_table(&mut self, table: &str, columns: &[ColumnDefinition]) {
        if let Err(e) = self.try_ensure_table(table, columns).await {
            error!("error creating table {}: {}", table, e);
        }
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Inserts `data` into `table`, binding values against the layout columns.
    /// An empty row is a no-op.
    pub async fn try_insert_row(&mut self, table: &str, data: &RowData) -> TableResult<InsertOutcome> {
        if data.is_empty() {
            warn!("no data to insert into table: {}", table);
            return Ok(InsertOutcome {
                table: table.to_string(),
                rows_affected: 0,
            });
        }

        let layout = Arc::clone(&self.layout);
        match self
            .backend
            .insert_row(table, layout.columns().as_slice(), data)
            .await
        {
            Ok(rows_affected) => {
                if rows_affected > 0 {
                    info!("inserted {} row(s) into table: {}", rows_affected, table);
                } else {
                    warn!("no rows inserted into table: {}", table);
                }
                self.stats.rows_inserted += rows_affected;
                Ok(InsertOutcome {
                    table: table.to_string(),
                    rows_affected,
                })
            }
            Err(e) => {
                self.stats.insert_failures += 1;
                Err(e)
            }
        }
    }

    /// Best-effort [`DynamicTables::try_insert_row`]. Returns rows affected.
    pub async fn insert_row(&mut self, table: &str, data: &RowData) -> u64 {
        match self.try_insert_row(table, data).await {
            Ok(outcome) => outcome.rows_affected,
            Err(e) => {
                error!("error inserting data into table {}: {}", table, e);
                0
            }
        }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Lists every table in the catalog schema.
    pub async fn tables(&mut self) -> TableResult<Vec<String>> {
        self.backend.list_tables().await
    }

    /// Lists the columns of `table`. Empty when the table does not exist.
    pub async fn columns(&mut self, table: &str) -> TableResult<Vec<ColumnInfo>> {
        let columns = self.backend.list_columns(table).await?;
        if columns.is_empty() {
            warn!("no columns found for table '{}' or the table does not exist", table);
        }
        Ok(columns)
    }

    /// Returns every row of `table`. Only plain identifiers are accepted.
    pub async fn rows(&mut self, table: &str) -> TableResult<Vec<Vec<Value>>> {
        if !sanitize::is_valid_identifier(table) {
            return Err(TableError::InvalidTableName(table.to_string()));
        }
        let rows = self.backend.fetch_rows(table).await?;
        if rows.is_empty() {
            info!("table '{}' exists but has no data", table);
        } else {
            info!("retrieved {} rows from table: {}", rows.len(), table);
        }
        Ok(rows)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Ends a manual-commit section: commit on success, rollback on failure.
    /// Auto-commit is re-enabled whatever the outcome.
    async fn finish_transaction<T>(&mut self, outcome: TableResult<T>) -> TableResult<T> {
        let result = match outcome {
            Ok(value) => match self.backend.commit().await {
                Ok(()) => Ok(value),
                Err(e) => {
                    self.rollback_logged().await;
                    Err(e)
                }
            },
            Err(e) => {
                self.rollback_logged().await;
                Err(e)
            }
        };

        if let Err(e) = self.backend.set_auto_commit(true).await {
            error!("error re-enabling auto-commit: {}", e);
        }
        result
    }

    async fn rollback_logged(&mut self) {
        match self.backend.rollback().await {
            Ok(()) => warn!("transaction rolled back due to an error"),
            Err(e) => error!("error during rollback: {}", e),
        }
    }
}

impl<B: Backend + std::fmt::Debug> std::fmt::Debug for DynamicTables<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTables")
            .field("backend", &self.backend)
            .field("layout", &self.layout)
            .field("stats", &self.stats)
            .finish()
    }
}
