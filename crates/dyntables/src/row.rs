//! Column-name to value mapping for a single insert.

use crate::value::Value;

/// An ordered column → value mapping.
///
/// Iteration order is first-insertion order and is the bind order of the
/// generated INSERT. Setting an existing column replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData {
    entries: Vec<(String, Value)>,
}

impl RowData {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value. Last write wins.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Builder-style variant of [`RowData::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Returns the value of a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Number of columns set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no column is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Column names in bind order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Values in bind order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Iterates over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RowData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RowData::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let row = RowData::new()
            .with("domain", "wikipedia.org")
            .with("keyword", "cats")
            .with("language", "en");

        let columns: Vec<_> = row.columns().collect();
        assert_eq!(columns, vec!["domain", "keyword", "language"]);
        assert_eq!(row.get("keyword"), Some(&Value::from("cats")));
    }

    #[test]
    fn test_last_write_wins() {
        let row: RowData = vec![("a", 1), ("b", 2), ("a", 3)].into_iter().collect();

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("a"), Some(&Value::Integer(3)));
        let columns: Vec<_> = row.columns().collect();
        assert_eq!(columns, vec!["a", "b"]);
    }

    #[test]
    fn test_empty() {
        let row = RowData::new();
        assert!(row.is_empty());
        assert!(row.get("x").is_none());
    }
}
