//! Prefix-scoped bulk deletion.

use tracing::{error, info};

use crate::backend::Backend;
use crate::error::{TableError, TableResult};

use super::DynamicTables;

/// Tables removed by one committed bulk delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// `LIKE` pattern the catalog was searched with.
    pub pattern: String,
    /// Dropped tables, in discovery order.
    pub dropped: Vec<String>,
}

impl EvictionReport {
    /// Number of dropped tables.
    pub fn count(&self) -> usize {
        self.dropped.len()
    }
}

impl<B: Backend> DynamicTables<B> {
    /// Drops every table whose name matches `prefix%`, all or nothing.
    ///
    /// Discovery and the drops run in one transaction. If any statement fails
    /// the transaction is rolled back and no table is removed. Auto-commit is
    /// enabled again before this returns.
    pub async fn try_delete_tables(&mut self) -> TableResult<EvictionReport> {
        let pattern = self.layout.prefix_pattern();

        self.backend
            .set_auto_commit(false)
            .await
            .map_err(|e| TableError::Transaction(e.to_string()))?;
        let outcome = self.discover_and_drop(&pattern).await;
        match self.finish_transaction(outcome).await {
            Ok(dropped) => {
                self.stats.evictions_committed += 1;
                self.stats.tables_dropped += dropped.len() as u64;
                info!("successfully deleted {} table(s)", dropped.len());
                Ok(EvictionReport { pattern, dropped })
            }
            Err(e) => {
                self.stats.evictions_rolled_back += 1;
                Err(match e {
                    TableError::Transaction(_) => e,
                    other => TableError::Transaction(other.to_string()),
                })
            }
        }
    }

    /// Best-effort [`DynamicTables::try_delete_tables`]. Returns the number of
    /// dropped tables, zero after a rollback.
    pub async fn delete_tables(&mut self) -> usize {
        match self.try_delete_tables().await {
            Ok(report) => report.count(),
            Err(e) => {
                error!("error deleting tables: {}", e);
                0
            }
        }
    }

    async fn discover_and_drop(&mut self, pattern: &str) -> TableResult<Vec<String>> {
        let tables = self.backend.tables_like(pattern).await?;
        if tables.is_empty() {
            info!("no tables match the prefix pattern {}", pattern);
        }
        for table in &tables {
            self.backend.drop_table(table).await?;
            info!("deleted table: {}", table);
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{Backend, MemoryBackend};
    use crate::error::TableError;
    use crate::DynamicTables;

    const COLUMNS: &str = "domain VARCHAR(100), keyword VARCHAR(100), language VARCHAR(100)";

    async fn populated() -> DynamicTables<MemoryBackend> {
        let mut tables = DynamicTables::in_memory();
        tables.set_columns(COLUMNS);
        tables.set_dynamic_column("domain");

        tables.set_table_prefix("dt1_");
        tables.input(["wikipedia.org", "cats", "en"]).await;
        tables.input(["google.com", "maps", "en"]).await;

        tables.set_table_prefix("dt2_");
        tables.input(["wikipedia.org", "dogs", "de"]).await;

        tables.set_table_prefix("dt1_");
        tables
    }

    #[tokio::test]
    async fn test_delete_only_matching_prefix() {
        let mut tables = populated().await;

        let report = tables.try_delete_tables().await.unwrap();
        assert_eq!(report.pattern, "dt1_%");
        assert_eq!(report.count(), 2);

        assert_eq!(tables.tables().await.unwrap(), vec!["dt2_wikipediaorg".to_string()]);
        assert_eq!(tables.backend().row_count("dt2_wikipediaorg"), Some(1));
        assert_eq!(tables.stats().tables_dropped, 2);
        assert_eq!(tables.stats().evictions_committed, 1);
        assert!(tables.backend().auto_commit());
    }

    #[tokio::test]
    async fn test_delete_with_no_matches() {
        let mut tables = populated().await;
        tables.set_table_prefix("nothing_");

        let report = tables.try_delete_tables().await.unwrap();
        assert!(report.dropped.is_empty());
        assert_eq!(tables.backend().table_count(), 3);
    }

    #[tokio::test]
    async fn test_drop_failure_rolls_back_everything() {
        let mut tables = populated().await;
        // dt1_googlecom is dropped first, then this one fails
        tables.backend_mut().fail_drop_of("dt1_wikipediaorg");

        let err = tables.try_delete_tables().await.unwrap_err();
        assert!(matches!(err, TableError::Transaction(_)));

        assert_eq!(tables.backend().table_count(), 3);
        assert!(tables.backend().has_table("dt1_googlecom"));
        assert!(tables.backend().auto_commit());
        assert!(!tables.backend().in_transaction());
        assert_eq!(tables.stats().evictions_rolled_back, 1);
        assert_eq!(tables.stats().tables_dropped, 0);
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let mut tables = populated().await;
        tables.backend_mut().fail_commit(true);

        assert_eq!(tables.delete_tables().await, 0);
        assert_eq!(tables.backend().table_count(), 3);
        assert!(tables.backend().auto_commit());
    }

    #[tokio::test]
    async fn test_catalog_failure() {
        let mut tables = populated().await;
        tables.backend_mut().fail_catalog(true);

        let err = tables.try_delete_tables().await.unwrap_err();
        assert!(matches!(err, TableError::Transaction(_)));

        tables.backend_mut().clear_failures();
        assert_eq!(tables.backend().table_count(), 3);
        assert!(tables.backend().auto_commit());
    }

    #[tokio::test]
    async fn test_delete_then_reinsert() {
        let mut tables = populated().await;
        assert_eq!(tables.delete_tables().await, 2);

        tables.input(["wikipedia.org", "birds", "en"]).await;
        assert_eq!(tables.backend().row_count("dt1_wikipediaorg"), Some(1));
    }
}
