//! Subcommands of `dtables`.
//!
//! `version`, `name` and `status` only read the layout. Everything else talks
//! to a backend through a [`DynamicTables`] manager.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use dyntables::{Backend, ColumnDefinition, DynamicTables, LayoutConfig, Value};

use crate::formatter::{self, OutputFormat};

const DEMO_PREFIX: &str = "dt1_";
const DEMO_COLUMNS: &str = "domain VARCHAR(100), keyword VARCHAR(100), language VARCHAR(100)";
const DEMO_ROWS: [[&str; 3]; 4] = [
    ["wikipedia.org", "cats", "en"],
    ["wikipedia.org", "dogs", "en"],
    ["google.com", "maps", "en"],
    ["google.com", "images", "en"],
];

/// A parsed subcommand.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the library version.
    Version,
    /// Show the table name a dynamic value maps to.
    Name {
        /// Raw dynamic-column value.
        raw: String,
    },
    /// Show the configured columns, dynamic column and prefix.
    Status,
    /// List tables.
    Tables,
    /// Describe a table, or every table when none is given.
    Columns {
        /// Table name.
        table: Option<String>,
    },
    /// Show every row of a table.
    Show {
        /// Table name.
        table: String,
    },
    /// Route one row, values in column order.
    Input {
        /// One value per configured column.
        #[arg(required = true, num_args = 1..)]
        values: Vec<String>,
        /// Create the table and insert the row in one transaction.
        #[arg(long)]
        atomic: bool,
    },
    /// Drop every table that carries the prefix.
    Delete,
    /// Clean the demo prefix, insert four rows across two domains, show them.
    Demo,
}

impl Command {
    /// Runs commands that need no database. Returns `None` for the others.
    pub fn execute_offline(&self, layout: &LayoutConfig) -> Option<String> {
        match self {
            Command::Version => Some(version_line()),
            Command::Name { raw } => Some(layout.format_table_name(raw)),
            Command::Status => Some(layout.to_string()),
            _ => None,
        }
    }

    /// Runs the command against `tables` and returns what to print.
    pub async fn execute<B: Backend>(
        &self,
        tables: &mut DynamicTables<B>,
        format: OutputFormat,
    ) -> Result<String> {
        match self {
            Command::Version => Ok(version_line()),

            Command::Name { raw } => Ok(tables.format_table_name(raw)),

            Command::Status => Ok(tables.layout().to_string()),

            Command::Tables => {
                let names = tables.tables().await.context("cannot list tables")?;
                Ok(formatter::format_table_names(&names, format))
            }

            Command::Columns { table: Some(table) } => describe(tables, table, format).await,

            Command::Columns { table: None } => {
                let names = tables.tables().await.context("cannot list tables")?;
                let mut sections = Vec::with_capacity(names.len());
                for name in &names {
                    sections.push(format!("{}\n{}", name, describe(tables, name, format).await?));
                }
                Ok(sections.join("\n\n"))
            }

            Command::Show { table } => show(tables, table, format).await,

            Command::Input { values, atomic } => {
                let values = coerce_row(tables.layout(), values)?;
                let outcome = if *atomic {
                    tables.try_input_atomic(values).await
                } else {
                    tables.try_input(values).await
                }
                .context("cannot insert row")?;
                Ok(format!(
                    "inserted {} row(s) into {}",
                    outcome.rows_affected, outcome.table
                ))
            }

            Command::Delete => {
                let report = tables
                    .try_delete_tables()
                    .await
                    .context("bulk delete rolled back")?;
                let mut output = format!(
                    "deleted {} table(s) matching {}",
                    report.count(),
                    report.pattern
                );
                for name in &report.dropped {
                    output.push_str("\n  ");
                    output.push_str(name);
                }
                Ok(output)
            }

            Command::Demo => demo(tables, format).await,
        }
    }
}

fn version_line() -> String {
    format!("dyntables {}", dyntables::VERSION)
}

async fn describe<B: Backend>(
    tables: &mut DynamicTables<B>,
    table: &str,
    format: OutputFormat,
) -> Result<String> {
    let columns = tables
        .columns(table)
        .await
        .with_context(|| format!("cannot describe {}", table))?;
    Ok(formatter::format_columns(&columns, format))
}

async fn show<B: Backend>(
    tables: &mut DynamicTables<B>,
    table: &str,
    format: OutputFormat,
) -> Result<String> {
    let columns: Vec<String> = tables
        .columns(table)
        .await
        .with_context(|| format!("cannot describe {}", table))?
        .into_iter()
        .map(|c| c.name)
        .collect();
    let rows = tables
        .rows(table)
        .await
        .with_context(|| format!("cannot read {}", table))?;
    Ok(formatter::format_rows(&columns, &rows, format))
}

async fn demo<B: Backend>(tables: &mut DynamicTables<B>, format: OutputFormat) -> Result<String> {
    info!("running the demo under prefix {}", DEMO_PREFIX);
    tables.set_table_prefix(DEMO_PREFIX);
    tables
        .try_delete_tables()
        .await
        .context("cannot clean the demo prefix")?;

    tables.set_columns(DEMO_COLUMNS);
    tables.set_dynamic_column("domain");
    for row in DEMO_ROWS {
        tables.try_input(row).await.context("demo insert failed")?;
    }

    let wiki = tables.format_table_name("wikipedia.org");
    let mut output = format!("---{}---\n", wiki);
    output.push_str(&show(tables, &wiki, format).await?);
    output.push('\n');
    let names = tables.tables().await.context("cannot list tables")?;
    output.push_str(&formatter::format_table_names(&names, format));
    Ok(output)
}

/// Converts command-line strings into values typed after their columns.
fn coerce_row(layout: &LayoutConfig, raw: &[String]) -> Result<Vec<Value>> {
    let columns = layout.columns();
    if columns.is_empty() {
        bail!("no columns configured (use --columns or the [layout] section)");
    }
    if columns.len() != raw.len() {
        // let the router report the arity mismatch
        return Ok(raw.iter().map(|s| Value::from(s.as_str())).collect());
    }
    columns
        .iter()
        .zip(raw)
        .map(|(column, value)| coerce(column, value))
        .collect()
}

fn coerce(column: &ColumnDefinition, raw: &str) -> Result<Value> {
    if raw.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }

    let sql_type = column.sql_type().to_ascii_lowercase();
    let invalid = || format!("invalid value {:?} for column {}", raw, column);
    let value = if sql_type.starts_with("int")
        || sql_type.starts_with("smallint")
        || sql_type.starts_with("bigint")
        || sql_type.contains("serial")
    {
        Value::Integer(raw.parse().with_context(invalid)?)
    } else if sql_type.starts_with("real")
        || sql_type.starts_with("double")
        || sql_type.starts_with("float")
    {
        Value::Float(raw.parse().with_context(invalid)?)
    } else if sql_type.starts_with("bool") {
        Value::Boolean(raw.parse().with_context(invalid)?)
    } else {
        Value::from(raw)
    };
    Ok(value)
}
