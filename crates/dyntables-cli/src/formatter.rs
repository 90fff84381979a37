//! Output formatting for catalog listings and table contents.
//!
//! Supports table and JSON output formats.

use comfy_table::{Cell, ContentArrangement, Table};
use serde_json::{json, Value as JsonValue};

use dyntables::{ColumnInfo, Value};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output.
    Table,
    /// JSON output.
    Json,
}

/// Formats a list of table names.
pub fn format_table_names(names: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(vec![Cell::new("table")]);
            for name in names {
                table.add_row(vec![Cell::new(name)]);
            }
            table.to_string()
        }
        OutputFormat::Json => to_pretty(&json!(names)),
    }
}

/// Formats the columns of one table.
pub fn format_columns(columns: &[ColumnInfo], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(vec![Cell::new("column"), Cell::new("type")]);
            for column in columns {
                table.add_row(vec![Cell::new(&column.name), Cell::new(&column.data_type)]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let columns: Vec<JsonValue> = columns
                .iter()
                .map(|c| json!({ "name": c.name, "type": c.data_type }))
                .collect();
            to_pretty(&JsonValue::Array(columns))
        }
    }
}

/// Formats rows under the given column names.
pub fn format_rows(columns: &[String], rows: &[Vec<Value>], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = new_table();
            if !columns.is_empty() {
                table.set_header(columns.iter().map(Cell::new));
            }
            for row in rows {
                let cells: Vec<Cell> = row.iter().map(|v| Cell::new(v.to_string())).collect();
                table.add_row(cells);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let rows: Vec<JsonValue> = rows
                .iter()
                .map(|row| {
                    let mut obj = serde_json::Map::new();
                    for (i, value) in row.iter().enumerate() {
                        let name = columns
                            .get(i)
                            .cloned()
                            .unwrap_or_else(|| format!("column_{}", i));
                        obj.insert(name, value_to_json(value));
                    }
                    JsonValue::Object(obj)
                })
                .collect();
            to_pretty(&JsonValue::Array(rows))
        }
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn to_pretty(value: &JsonValue) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

/// Converts a cell value to a JSON value. Bytes become a `\x`-prefixed hex
/// string, as PostgreSQL prints `bytea`.
fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => json!(*b),
        Value::Integer(i) => json!(*i),
        Value::Float(f) => json!(*f),
        Value::String(s) => json!(s),
        Value::Bytes(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
            json!(format!("\\x{}", hex))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> (Vec<String>, Vec<Vec<Value>>) {
        let columns = vec!["id".to_string(), "domain".to_string(), "keyword".to_string()];
        let rows = vec![
            vec![Value::Integer(1), Value::from("wikipedia.org"), Value::from("cats")],
            vec![Value::Integer(2), Value::from("wikipedia.org"), Value::Null],
        ];
        (columns, rows)
    }

    #[test]
    fn test_format_rows_table() {
        let (columns, rows) = sample_rows();
        let output = format_rows(&columns, &rows, OutputFormat::Table);
        assert!(output.contains("domain"));
        assert!(output.contains("wikipedia.org"));
        assert!(output.contains("NULL"));
    }

    #[test]
    fn test_format_rows_json() {
        let (columns, rows) = sample_rows();
        let output = format_rows(&columns, &rows, OutputFormat::Json);
        let parsed: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["id"], json!(1));
        assert_eq!(parsed[0]["keyword"], json!("cats"));
        assert_eq!(parsed[1]["keyword"], JsonValue::Null);
    }

    #[test]
    fn test_format_columns_json() {
        let columns = vec![ColumnInfo::new("id", "integer"), ColumnInfo::new("domain", "character varying")];
        let parsed: JsonValue =
            serde_json::from_str(&format_columns(&columns, OutputFormat::Json)).unwrap();
        assert_eq!(parsed[1]["name"], json!("domain"));
        assert_eq!(parsed[1]["type"], json!("character varying"));
    }

    #[test]
    fn test_format_table_names() {
        let names = vec!["dt1_googlecom".to_string(), "dt1_wikipediaorg".to_string()];
        let output = format_table_names(&names, OutputFormat::Table);
        assert!(output.contains("dt1_googlecom"));
        assert_eq!(format_table_names(&[], OutputFormat::Json), "[]");
    }

    #[test]
    fn test_bytes_to_json() {
        assert_eq!(value_to_json(&Value::Bytes(vec![0xde, 0xad])), json!("\\xdead"));
    }
}
