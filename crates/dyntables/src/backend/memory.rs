//! In-memory backend for testing.
//!
//! Tables live in a sorted map. Transactions snapshot the whole map and
//! restore it on rollback, so all-or-nothing behavior can be observed without
//! a server. Individual statements can be made to fail by table name.

use std::collections::{BTreeMap, HashSet};

use crate::error::{TableError, TableResult};
use crate::row::RowData;
use crate::schema::ColumnDefinition;
use crate::value::Value;

use super::{Backend, BackendFuture, ColumnInfo};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<ColumnDefinition>,
    rows: Vec<Vec<Value>>,
    next_id: i64,
}

/// Statements forced to fail.
#[derive(Debug, Clone, Default)]
struct FailurePlan {
    create: HashSet<String>,
    insert: HashSet<String>,
    drop: HashSet<String>,
    catalog: bool,
    commit: bool,
}

/// In-process backend.
#[derive(Debug)]
pub struct MemoryBackend {
    tables: BTreeMap<String, MemoryTable>,
    /// State to restore on rollback, taken when a transaction begins.
    snapshot: Option<BTreeMap<String, MemoryTable>>,
    auto_commit: bool,
    closed: bool,
    failures: FailurePlan,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend in auto-commit mode.
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            snapshot: None,
            auto_commit: true,
            closed: false,
            failures: FailurePlan::default(),
        }
    }

    /// Makes `CREATE TABLE` of `table` fail.
    pub fn fail_create_of(&mut self, table: impl Into<String>) {
        self.failures.create.insert(table.into());
    }

    /// Makes inserts into `table` fail.
    pub fn fail_insert_into(&mut self, table: impl Into<String>) {
        self.failures.insert.insert(table.into());
    }

    /// Makes `DROP TABLE` of `table` fail.
    pub fn fail_drop_of(&mut self, table: impl Into<String>) {
        self.failures.drop.insert(table.into());
    }

    /// Makes catalog queries fail.
    pub fn fail_catalog(&mut self, fail: bool) {
        self.failures.catalog = fail;
    }

    /// Makes `commit` fail.
    pub fn fail_commit(&mut self, fail: bool) {
        self.failures.commit = fail;
    }

    /// Removes every injected failure.
    pub fn clear_failures(&mut self) {
        self.failures = FailurePlan::default();
    }

    /// Returns true if `table` exists.
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of rows in `table`, if it exists.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(|t| t.rows.len())
    }

    /// Returns true while an explicit transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn ensure_open(&mut self) -> TableResult<()> {
        if self.closed {
            return Err(TableError::ConnectionClosed);
        }
        if !self.auto_commit && self.snapshot.is_none() {
            self.snapshot = Some(self.tables.clone());
        }
        Ok(())
    }

    fn check_catalog(&self) -> TableResult<()> {
        if self.failures.catalog {
            return Err(TableError::Catalog("injected catalog failure".into()));
        }
        Ok(())
    }

    fn create_table_sync(&mut self, table: &str, columns: &[ColumnDefinition]) -> TableResult<()> {
        self.ensure_open()?;
        if table.is_empty() || self.failures.create.contains(table) {
            return Err(TableError::Schema {
                table: table.to_string(),
                reason: if table.is_empty() {
                    "zero-length delimited identifier".into()
                } else {
                    "injected create failure".into()
                },
            });
        }
        self.tables
            .entry(table.to_string())
            .or_insert_with(|| MemoryTable {
                columns: columns.to_vec(),
                rows: Vec::new(),
                next_id: 1,
            });
        Ok(())
    }

    fn insert_row_sync(&mut self, table: &str, row: &RowData) -> TableResult<u64> {
        self.ensure_open()?;
        let insert_error = |reason: String| TableError::Insert {
            table: table.to_string(),
            reason,
        };
        if self.failures.insert.contains(table) {
            return Err(insert_error("injected insert failure".into()));
        }
        let Some(stored) = self.tables.get_mut(table) else {
            return Err(insert_error(format!("relation \"{}\" does not exist", table)));
        };

        let mut values = vec![Value::Null; stored.columns.len()];
        for (column, value) in row.iter() {
            let Some(pos) = stored.columns.iter().position(|c| c.name() == column) else {
                return Err(insert_error(format!(
                    "column \"{}\" of relation \"{}\" does not exist",
                    column, table
                )));
            };
            values[pos] = value.clone();
        }

        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(Value::Integer(stored.next_id));
        record.extend(values);
        stored.next_id += 1;
        stored.rows.push(record);
        Ok(1)
    }

    fn drop_table_sync(&mut self, table: &str) -> TableResult<()> {
        self.ensure_open()?;
        if self.failures.drop.contains(table) {
            return Err(TableError::Transaction(format!(
                "injected drop failure for {}",
                table
            )));
        }
        self.tables.remove(table);
        Ok(())
    }

    fn tables_like_sync(&mut self, pattern: &str) -> TableResult<Vec<String>> {
        self.ensure_open()?;
        self.check_catalog()?;
        Ok(self
            .tables
            .keys()
            .filter(|name| like_match(pattern, name))
            .cloned()
            .collect())
    }

    fn end_transaction(&mut self, commit: bool) -> TableResult<()> {
        if self.closed {
            return Err(TableError::ConnectionClosed);
        }
        if self.auto_commit {
            return Err(TableError::Transaction(
                "transaction end requested while auto-commit is enabled".into(),
            ));
        }
        if commit && self.failures.commit {
            return Err(TableError::Transaction("injected commit failure".into()));
        }
        if let Some(snapshot) = self.snapshot.take() {
            if !commit {
                self.tables = snapshot;
            }
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn create_table<'a>(
        &'a mut self,
        table: &'a str,
        columns: &'a [ColumnDefinition],
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move { self.create_table_sync(table, columns) })
    }

    fn insert_row<'a>(
        &'a mut self,
        table: &'a str,
        _columns: &'a [ColumnDefinition],
        row: &'a RowData,
    ) -> BackendFuture<'a, u64> {
        Box::pin(async move { self.insert_row_sync(table, row) })
    }

    fn drop_table<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move { self.drop_table_sync(table) })
    }

    fn list_tables(&mut self) -> BackendFuture<'_, Vec<String>> {
        Box::pin(async move { self.tables_like_sync("%") })
    }

    fn tables_like<'a>(&'a mut self, pattern: &'a str) -> BackendFuture<'a, Vec<String>> {
        Box::pin(async move { self.tables_like_sync(pattern) })
    }

    fn list_columns<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, Vec<ColumnInfo>> {
        Box::pin(async move {
            self.ensure_open()?;
            self.check_catalog()?;
            let Some(stored) = self.tables.get(table) else {
                return Ok(Vec::new());
            };
            let mut columns = vec![ColumnInfo::new("id", "integer")];
            columns.extend(
                stored
                    .columns
                    .iter()
                    .map(|c| ColumnInfo::new(c.name(), c.sql_type().to_lowercase())),
            );
            Ok(columns)
        })
    }

    fn fetch_rows<'a>(&'a mut self, table: &'a str) -> BackendFuture<'a, Vec<Vec<Value>>> {
        Box::pin(async move {
            self.ensure_open()?;
            self.check_catalog()?;
            self.tables
                .get(table)
                .map(|t| t.rows.clone())
                .ok_or_else(|| TableError::Catalog(format!("relation \"{}\" does not exist", table)))
        })
    }

    fn set_auto_commit(&mut self, enabled: bool) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            if self.closed {
                return Err(TableError::ConnectionClosed);
            }
            if enabled {
                if let Some(snapshot) = self.snapshot.take() {
                    self.tables = snapshot;
                }
            }
            self.auto_commit = enabled;
            Ok(())
        })
    }

    fn commit(&mut self) -> BackendFuture<'_, ()> {
        Box::pin(async move { self.end_transaction(true) })
    }

    fn rollback(&mut self) -> BackendFuture<'_, ()> {
        Box::pin(async move { self.end_transaction(false) })
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn close(&mut self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            self.closed = true;
            Ok(())
        })
    }
}

/// SQL `LIKE`: `%` matches any run, `_` one character, `\` escapes.
pub(crate) fn like_match(pattern: &str, text: &str) -> bool {
    #[derive(Clone, Copy)]
    enum Token {
        Any,
        One,
        Lit(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Lit(chars.next().unwrap_or('\\')),
            c => Token::Lit(c),
        });
    }

    let text: Vec<char> = text.chars().collect();
    // matched[j]: the tokens seen so far match text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Any => {
                let mut reachable = false;
                for j in 0..=text.len() {
                    reachable |= matched[j];
                    next[j] = reachable;
                }
            }
            Token::One => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            Token::Lit(c) => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == c;
                }
            }
        }
        matched = next;
    }
    matched[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSet;

    fn columns() -> ColumnSet {
        ColumnSet::parse("domain VARCHAR(100), keyword VARCHAR(100)")
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("dt1_%", "dt1_wikipediaorg"));
        assert!(like_match("dt1_%", "dt1_"));
        assert!(!like_match("dt1_%", "dt2_wikipediaorg"));
        // `_` is a wildcard, so this prefix also matches "dt1x..."
        assert!(like_match("dt1_%", "dt1xgooglecom"));
        assert!(!like_match("dt1\\_%", "dt1xgooglecom"));
        assert!(like_match("%", ""));
        assert!(like_match("a%c", "abbbc"));
        assert!(!like_match("a%c", "abbbd"));
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let mut backend = MemoryBackend::new();
        let columns = columns();

        backend.create_table("t", columns.as_slice()).await.unwrap();
        backend.create_table("t", columns.as_slice()).await.unwrap();
        assert_eq!(backend.table_count(), 1);

        let info = backend.list_columns("t").await.unwrap();
        let names: Vec<_> = info.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "domain", "keyword"]);
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let mut backend = MemoryBackend::new();
        backend.create_table("t", columns().as_slice()).await.unwrap();

        let row = RowData::new().with("keyword", "cats").with("domain", "a.org");
        assert_eq!(backend.insert_row("t", &[], &row).await.unwrap(), 1);
        backend.insert_row("t", &[], &row).await.unwrap();

        let rows = backend.fetch_rows("t").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], Value::Integer(2));
        assert_eq!(rows[0][1], Value::from("a.org"));
        assert_eq!(rows[0][2], Value::from("cats"));
    }

    #[tokio::test]
    async fn test_insert_unknown_table_or_column() {
        let mut backend = MemoryBackend::new();
        let row = RowData::new().with("domain", "a.org");
        assert!(matches!(
            backend.insert_row("missing", &[], &row).await,
            Err(TableError::Insert { .. })
        ));

        backend.create_table("t", columns().as_slice()).await.unwrap();
        let row = RowData::new().with("nope", 1);
        assert!(backend.insert_row("t", &[], &row).await.is_err());
    }

    #[tokio::test]
    async fn test_rollback_restores_tables() {
        let mut backend = MemoryBackend::new();
        backend.create_table("a", columns().as_slice()).await.unwrap();
        backend.create_table("b", columns().as_slice()).await.unwrap();

        backend.set_auto_commit(false).await.unwrap();
        backend.drop_table("a").await.unwrap();
        assert!(backend.in_transaction());
        assert!(!backend.has_table("a"));
        backend.rollback().await.unwrap();
        backend.set_auto_commit(true).await.unwrap();

        assert!(backend.has_table("a"));
        assert!(backend.has_table("b"));
    }

    #[tokio::test]
    async fn test_commit_keeps_changes() {
        let mut backend = MemoryBackend::new();
        backend.create_table("a", columns().as_slice()).await.unwrap();

        backend.set_auto_commit(false).await.unwrap();
        backend.drop_table("a").await.unwrap();
        backend.commit().await.unwrap();
        backend.set_auto_commit(true).await.unwrap();

        assert!(!backend.has_table("a"));
        assert!(!backend.in_transaction());
    }

    #[tokio::test]
    async fn test_enabling_auto_commit_discards_open_transaction() {
        let mut backend = MemoryBackend::new();
        backend.create_table("a", columns().as_slice()).await.unwrap();

        backend.set_auto_commit(false).await.unwrap();
        backend.drop_table("a").await.unwrap();
        backend.set_auto_commit(true).await.unwrap();

        assert!(backend.has_table("a"));
    }

    #[tokio::test]
    async fn test_commit_requires_manual_mode() {
        let mut backend = MemoryBackend::new();
        assert!(matches!(
            backend.commit().await,
            Err(TableError::Transaction(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_backend() {
        let mut backend = MemoryBackend::new();
        backend.close().await.unwrap();
        assert!(matches!(
            backend.list_tables().await,
            Err(TableError::ConnectionClosed)
        ));
    }
}
