//! PostgreSQL backend over a single `tokio-postgres` connection.

use tokio::task::JoinHandle;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

use crate::config::ConnectionConfig;
use crate::error::{TableError, TableResult};
use crate::row::RowData;
use crate::schema::ColumnDefinition;
use crate::sql;
use crate::value::Value;

use super::{Backend, BackendFuture, ColumnInfo};

/// Production backend.
///
/// Owns one client and the task driving its connection. There is no pool and
/// no reconnect: once the connection fails, every call returns an error.
pub struct PgBackend {
    /// Client handle, `None` after `close`.
    client: Option<Client>,
    /// Connection driver task.
    driver: Option<JoinHandle<()>>,
    /// Schema used by catalog queries.
    schema: String,
    /// Auto-commit flag.
    auto_commit: bool,
    /// Whether a `BEGIN` has been issued and not yet ended.
    in_transaction: bool,
}

impl PgBackend {
    /// Opens a connection.
    pub async fn connect(config: &ConnectionConfig) -> TableResult<Self> {
        config.validate()?;

        let (client, connection) = config.to_pg_config().connect(NoTls).await.map_err(|e| {
            error!("database connection failed: {}", e);
            TableError::ConnectionFailed(describe(&e))
        })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("database connection error: {}", e);
            }
        });

        info!("connected to the database: {}", config.display_target());

        Ok(Self {
            client: Some(client),
            driver: Some(driver),
            schema: config.schema.clone(),
            auto_commit: true,
            in_transaction: false,
        })
    }

    /// Returns true until `close` is called or the connection drops.
    pub fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// Returns the underlying client, for queries outside this crate's surface.
    pub fn client(&self) -> TableResult<&Client> {
        self.client.as_ref().ok_or(TableError::ConnectionClosed)
    }

    /// Issues `BEGIN` when auto-commit is off and no transaction is open.
    async fn begin_if_needed(&mut self) -> TableResult<()> {
        if self.auto_commit || self.in_transaction {
            return Ok(());
        }
        self.client()?
            .batch_execute("BEGIN")
            .await
            .map_err(|e| TableError::Transaction(describe(&e)))?;
        self.in_transaction = true;
        Ok(())
    }

    async fn end_transaction(&mut self, statement: &str) -> TableResult<()> {
        if self.auto_commit {
            return Err(TableError::Transaction(format!(
                "{} requested while auto-commit is enabled",
                statement
            )));
        }
        if !self.in_transaction {
            return Ok(());
        }
        // The transaction is over whether or not the statement succeeds.
        self.in_transaction = false;
        self.client()?
            .batch_execute(statement)
            .await
            .map_err(|e| TableError::Transaction(describe(&e)))
    }
}

impl Backend for PgBackend {
    fn create_table<'a>(
        &'a mut self,
        table: &'a str,
        columns: &'a [ColumnDefinition],
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.begin_if_needed().await?;
            let statement = sql::create_table(table, columns);
            debug!("table creation query: {}", statement);
            self.client()?
                .batch_execute(&statement)
                .await
                .map_err(|e| TableError::Schema {
                    table: table.to_string(),
                    reason: describe(&e),
                })
        })
    }

    fn insert_row<'a>(
        &'a mut self,
        table: &'a str,
        columns: &'a [ColumnDefinition],
        row: &'a RowData,
    ) -> BackendFuture<'a, u64> {
        Box::pin(async move {
            self.begin_if_needed().await?;
            let statement = sql::insert_row(table, columns, row);
            debug!("insert query: {}", statement);
            let params: Vec<&(dyn ToSql + Sync)> =
                row.values().map(|v| v as &(dyn ToSql + Sync)).collect();
            self.client()?
                .execute(statement.as_str(), &params)
                .await
                .map_err(|e| TableError::Insert {
                    table: table.to_string(),
                    reason: describe(&e),
                })
        })
    }

    fn drop_table<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.begin_if_needed().await?;
            let statement = sql::drop_table(table);
            debug!("drop query: {}", statement);
            self.client()?
                .batch_execute(&statement)
                .await
                .map_err(|e| TableError::Transaction(describe(&e)))
        })
    }

    fn list_tables(&mut self) -> BackendFuture<'_, Vec<String>> {
        Box::pin(async move {
            self.begin_if_needed().await?;
            let rows = self
                .client()?
                .query(sql::LIST_TABLES, &[&self.schema])
                .await
                .map_err(|e| TableError::Catalog(describe(&e)))?;
            rows.iter().map(first_text).collect()
        })
    }

    fn tables_like<'a>(&'a mut self, pattern: &'a str) -> BackendFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.begin_if_needed().await?;
            let rows = self
                .client()?
                .query(sql::LIST_TABLES_LIKE, &[&self.schema, &pattern])
                .await
                .map_err(|e| TableError::Catalog(describe(&e)))?;
            rows.iter().map(first_text).collect()
        })
    }

    fn list_columns<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, Vec<ColumnInfo>> {
        Box::pin(async move {
            self.begin_if_needed().await?;
            let rows = self
                .client()?
                .query(sql::LIST_COLUMNS, &[&self.schema, &table])
                .await
                .map_err(|e| TableError::Catalog(describe(&e)))?;
            rows.iter()
                .map(|row| {
                    let name: String = row.try_get(0).map_err(|e| TableError::Catalog(describe(&e)))?;
                    let data_type: String =
                        row.try_get(1).map_err(|e| TableError::Catalog(describe(&e)))?;
                    Ok(ColumnInfo { name, data_type })
                })
                .collect()
        })
    }

    fn fetch_rows<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, Vec<Vec<Value>>> {
        Box::pin(async move {
            self.begin_if_needed().await?;
            let rows = self
                .client()?
                .query(sql::select_all(table).as_str(), &[])
                .await
                .map_err(|e| TableError::Catalog(describe(&e)))?;
            Ok(rows
                .iter()
                .map(|row| (0..row.len()).map(|idx| column_value(row, idx)).collect())
                .collect())
        })
    }

    fn set_auto_commit(&mut self, enabled: bool) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            if enabled && self.in_transaction {
                self.in_transaction = false;
                self.client()?
                    .batch_execute("ROLLBACK")
                    .await
                    .map_err(|e| TableError::Transaction(describe(&e)))?;
            }
            self.auto_commit = enabled;
            Ok(())
        })
    }

    fn commit(&mut self) -> BackendFuture<'_, ()> {
        Box::pin(self.end_transaction("COMMIT"))
    }

    fn rollback(&mut self) -> BackendFuture<'_, ()> {
        Box::pin(self.end_transaction("ROLLBACK"))
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn close(&mut self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            // Dropping the client ends the connection; the driver then returns.
            if self.client.take().is_some() {
                if let Some(driver) = self.driver.take() {
                    join_driver(driver).await;
                }
                info!("database connection closed");
            }
            Ok(())
        })
    }
}

impl std::fmt::Debug for PgBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgBackend")
            .field("connected", &self.is_connected())
            .field("schema", &self.schema)
            .field("auto_commit", &self.auto_commit)
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

/// Waits for the connection task. Returns false if it panicked or was cancelled.
async fn join_driver(driver: JoinHandle<()>) -> bool {
    match driver.await {
        Ok(()) => true,
        Err(e) => {
            error!("database connection task failed: {}", e);
            false
        }
    }
}

/// Server message when available, driver message otherwise.
fn describe(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    }
}

fn first_text(row: &Row) -> TableResult<String> {
    row.try_get(0).map_err(|e| TableError::Catalog(describe(&e)))
}

/// Decodes one cell. Types without a `Value` mapping decode as text when the
/// driver allows it and as `Null` otherwise.
fn column_value(row: &Row, idx: usize) -> Value {
    let ty = row.columns()[idx].type_();
    let decoded = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx).map(Value::from)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)
            .map(|v| Value::from(v.map(i64::from)))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)
            .map(|v| Value::from(v.map(i64::from)))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx).map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)
            .map(|v| Value::from(v.map(f64::from)))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx).map(Value::from)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx).map(Value::from)
    } else {
        row.try_get::<_, Option<String>>(idx).map(Value::from)
    };

    decoded.unwrap_or_else(|e| {
        debug!("cannot decode column {} of type {}: {}", idx, ty, e);
        Value::Null
    })
}
