use std::fmt;

use crate::sanitize;

use super::{ColumnDefinition, ColumnSet};

/// Prefix applied to generated table names when none is configured.
pub const DEFAULT_TABLE_PREFIX: &str = "dtbl_";

/// Columns, dynamic column and table prefix, as one immutable value.
///
/// Reconfiguration produces a new layout; nothing is mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    columns: ColumnSet,
    dynamic_column: String,
    table_prefix: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: ColumnSet::new(),
            dynamic_column: String::new(),
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
        }
    }
}

impl LayoutConfig {
    /// Creates a layout with no columns and the default prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the column list replaced.
    pub fn with_columns(&self, columns: ColumnSet) -> Self {
        Self {
            columns,
            ..self.clone()
        }
    }

    /// Returns a copy with the dynamic column replaced.
    pub fn with_dynamic_column(&self, name: impl Into<String>) -> Self {
        Self {
            dynamic_column: name.into(),
            ..self.clone()
        }
    }

    /// Returns a copy with the table prefix replaced.
    pub fn with_table_prefix(&self, prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: prefix.into(),
            ..self.clone()
        }
    }

    /// The configured columns.
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    /// Name of the column whose value selects the table.
    pub fn dynamic_column(&self) -> &str {
        &self.dynamic_column
    }

    /// Table name prefix.
    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Position of the dynamic column, if it is set and configured.
    pub fn dynamic_position(&self) -> Option<usize> {
        if self.dynamic_column.is_empty() {
            return None;
        }
        self.columns.position(&self.dynamic_column)
    }

    /// `prefix + sanitize(raw)`.
    pub fn format_table_name(&self, raw: &str) -> String {
        sanitize::format_table_name(&self.table_prefix, raw)
    }

    /// The `LIKE` pattern matching every table of this prefix.
    ///
    /// `%` and `_` inside the prefix keep their wildcard meaning.
    pub fn prefix_pattern(&self) -> String {
        format!("{}%", self.table_prefix)
    }
}

impl fmt::Display for LayoutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configured Columns:")?;
        for column in &self.columns {
            writeln!(f, "  {}", column)?;
        }
        writeln!(f, "Dynamic Column: {}", self.dynamic_column)?;
        write!(f, "Table Prefix: {}", self.table_prefix)
    }
}

impl From<Vec<ColumnDefinition>> for LayoutConfig {
    fn from(columns: Vec<ColumnDefinition>) -> Self {
        Self::default().with_columns(columns.into_iter().collect())
    }
}
