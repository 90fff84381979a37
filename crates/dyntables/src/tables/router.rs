//! Row routing: one row in, one table picked (and created) by its dynamic value.

use std::sync::Arc;

use tracing::{debug, error};

use crate::backend::Backend;
use crate::error::{TableError, TableResult};
use crate::row::RowData;
use crate::value::Value;

use super::{DynamicTables, InsertOutcome};

/// A row paired with the table it belongs to.
struct RoutedRow {
    table: String,
    data: RowData,
}

impl<B: Backend> DynamicTables<B> {
    /// Maps positional values onto the configured columns and names the table.
    fn route(&self, values: Vec<Value>) -> TableResult<RoutedRow> {
        let layout = &self.layout;
        let columns = layout.columns();

        if values.len() != columns.len() {
            return Err(TableError::ArityMismatch {
                expected: columns.len(),
                actual: values.len(),
            });
        }
        let Some(position) = layout.dynamic_position() else {
            return Err(TableError::DynamicColumnNotFound(
                layout.dynamic_column().to_string(),
            ));
        };
        if values[position].is_null() {
            return Err(TableError::InvalidDynamicValue(
                layout.dynamic_column().to_string(),
            ));
        }

        let table = layout.format_table_name(&values[position].to_string());
        let data = columns
            .iter()
            .map(|column| column.name().to_string())
            .zip(values)
            .collect::<RowData>();

        debug!("routing row to table {}", table);
        Ok(RoutedRow { table, data })
    }

    fn route_counted<I>(&mut self, values: I) -> TableResult<RoutedRow>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let routed = self.route(values);
        if routed.is_err() {
            self.stats.rejected_rows += 1;
        }
        routed
    }

    /// Routes one row: creates its table if needed, then inserts it.
    ///
    /// `values` are positional, one per configured column. Creation and
    /// insertion are separate statements; see [`DynamicTables::try_input_atomic`]
    /// for the single-transaction variant.
    pub async fn try_input<I>(&mut self, values: I) -> TableResult<InsertOutcome>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let routed = self.route_counted(values)?;
        self.create_and_insert(&routed).await
    }

    /// Like [`DynamicTables::try_input`], but the create and the insert share
    /// one transaction: either the row is stored or nothing changes.
    pub async fn try_input_atomic<I>(&mut self, values: I) -> TableResult<InsertOutcome>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let routed = self.route_counted(values)?;

        let ensured_before = self.stats.tables_ensured;
        let inserted_before = self.stats.rows_inserted;

        self.backend.set_auto_commit(false).await?;
        let outcome = self.create_and_insert(&routed).await;
        let result = self.finish_transaction(outcome).await;
        if result.is_err() {
            // the rollback undid both the create and the insert
            self.stats.tables_ensured = ensured_before;
            self.stats.rows_inserted = inserted_before;
        }
        result
    }

    /// Best-effort [`DynamicTables::try_input`]. Returns rows affected.
    ///
    /// A failed create is logged and the insert is still attempted.
    pub async fn input<I>(&mut self, values: I) -> u64
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let routed = match self.route_counted(values) {
            Ok(routed) => routed,
            Err(e) => {
                error!("rejected row: {}", e);
                return 0;
            }
        };

        let layout = Arc::clone(&self.layout);
        self.ensure_table(&routed.table, layout.columns().as_slice())
            .await;
        self.insert_row(&routed.table, &routed.data).await
    }

    async fn create_and_insert(&mut self, routed: &RoutedRow) -> TableResult<InsertOutcome> {
        let layout = Arc::clone(&self.layout);
        self.try_ensure_table(&routed.table, layout.columns().as_slice())
            .await?;
        self.try_insert_row(&routed.table, &routed.data).await
    }
}
