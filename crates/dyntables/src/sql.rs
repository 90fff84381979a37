//! SQL statement construction.
//!
//! Every identifier is double-quoted so mixed case and reserved words survive.
//! Values are never interpolated; inserts use `$n` placeholders.

use std::fmt::Write;

use crate::row::RowData;
use crate::schema::ColumnDefinition;
use crate::value::Value;

/// Catalog query listing base tables of one schema.
pub const LIST_TABLES: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = $1::text AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

/// Catalog query listing base tables of one schema whose name matches a `LIKE` pattern.
pub const LIST_TABLES_LIKE: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = $1::text AND table_type = 'BASE TABLE' \
     AND table_name::text LIKE $2::text \
     ORDER BY table_name";

/// Catalog query listing the columns of a table in ordinal order.
pub const LIST_COLUMNS: &str = "SELECT column_name::text, data_type::text \
     FROM information_schema.columns \
     WHERE table_schema = $1::text AND table_name = $2::text \
     ORDER BY ordinal_position";

/// Quotes an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// `CREATE TABLE IF NOT EXISTS` with a serial `id` key followed by the columns.
pub fn create_table(table: &str, columns: &[ColumnDefinition]) -> String {
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (id SERIAL PRIMARY KEY",
        quote_ident(table)
    );
    for column in columns {
        let _ = write!(sql, ", {} {}", quote_ident(column.name()), column.sql_type());
    }
    sql.push(')');
    sql
}

/// Parameterized INSERT binding `row` in its iteration order.
///
/// A string headed for a column declared in `columns` with a non-text type is
/// bound as text and cast to that type, so `NUMERIC` or `DATE` columns accept
/// their literal form.
pub fn insert_row(table: &str, columns: &[ColumnDefinition], row: &RowData) -> String {
    let mut names = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());
    for (i, (name, value)) in row.iter().enumerate() {
        names.push(quote_ident(name));
        let declared = columns.iter().find(|c| c.name() == name);
        match declared {
            Some(column) if matches!(value, Value::String(_)) && !column.is_text() => {
                placeholders.push(format!("CAST(${}::text AS {})", i + 1, column.sql_type()));
            }
            _ => placeholders.push(format!("${}", i + 1)),
        }
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// `DROP TABLE IF EXISTS ... CASCADE`.
pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", quote_ident(table))
}

/// `SELECT *` ordered by the serial key.
pub fn select_all(table: &str) -> String {
    format!("SELECT * FROM {} ORDER BY id", quote_ident(table))
}
