//! Column definitions and the generic table layout.
//!
//! A [`ColumnSet`] is parsed once from a column list such as
//! `"domain VARCHAR(100), keyword VARCHAR(100), language VARCHAR(100)"` and
//! defines both the CREATE TABLE column order and the positional mapping of
//! row values. [`LayoutConfig`] adds the dynamic column and the table prefix.

mod layout;

pub use layout::{LayoutConfig, DEFAULT_TABLE_PREFIX};

use std::fmt;

use tracing::{debug, warn};

use crate::error::{TableError, TableResult};

/// A configured column: name plus SQL type text.
///
/// Two definitions are equal when their names are equal.
#[derive(Debug, Clone, Eq)]
pub struct ColumnDefinition {
    name: String,
    sql_type: String,
}

impl ColumnDefinition {
    /// Creates a column definition.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SQL type, verbatim from the column list (e.g. `VARCHAR(100)`).
    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    /// True for character types (`TEXT`, `VARCHAR(n)`, `CHARACTER VARYING`, ...).
    pub fn is_text(&self) -> bool {
        let ty = self.sql_type.to_ascii_lowercase();
        ["text", "varchar", "char", "bpchar", "name", "citext"]
            .iter()
            .any(|prefix| ty.starts_with(prefix))
    }

    /// Parses one `name type` entry.
    ///
    /// The name is the first whitespace-delimited token and the type is the
    /// remainder, which may itself contain whitespace.
    pub fn parse(entry: &str) -> TableResult<Self> {
        let entry = entry.trim();
        let Some((name, rest)) = entry.split_once(char::is_whitespace) else {
            return Err(TableError::MalformedColumn(entry.to_string()));
        };
        let sql_type = rest.trim_start();
        if name.is_empty() || sql_type.is_empty() {
            return Err(TableError::MalformedColumn(entry.to_string()));
        }
        Ok(Self::new(name, sql_type))
    }
}

impl PartialEq for ColumnDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.sql_type)
    }
}

/// Ordered list of column definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    columns: Vec<ColumnDefinition>,
}

impl ColumnSet {
    /// Creates an empty column set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated column list, skipping malformed entries with a warning.
    pub fn parse(spec: &str) -> Self {
        let mut columns = Vec::new();
        for entry in split_entries(spec) {
            match ColumnDefinition::parse(entry) {
                Ok(column) => {
                    debug!(column = %column, "adding column definition");
                    columns.push(column);
                }
                Err(e) => warn!("skipping column entry: {}", e),
            }
        }
        Self { columns }
    }

    /// Parses a comma-separated column list, failing on the first malformed entry.
    pub fn parse_strict(spec: &str) -> TableResult<Self> {
        let columns = split_entries(spec)
            .map(ColumnDefinition::parse)
            .collect::<TableResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if no columns are configured.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Iterates over the columns in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDefinition> {
        self.columns.iter()
    }

    /// Returns the columns as a slice.
    pub fn as_slice(&self) -> &[ColumnDefinition] {
        &self.columns
    }
}

impl FromIterator<ColumnDefinition> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = ColumnDefinition>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnDefinition;
    type IntoIter = std::slice::Iter<'a, ColumnDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Splits on commas at parenthesis depth zero, so `NUMERIC(10, 2)` stays whole.
fn split_entries(spec: &str) -> impl Iterator<Item = &str> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in spec.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(&spec[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&spec[start..]);
    entries.into_iter()
}
