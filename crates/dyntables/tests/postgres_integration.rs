//! Integration tests against a live PostgreSQL server.
//!
//! Connection settings come from the `DTABLES_ENVS_PGSQL_*` variables. When
//! they are missing or the server is unreachable, each test prints a notice
//! and returns.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use dyntables::{ConnectionConfig, DynamicTables, PgBackend, TableError, Value};
use tokio::time::timeout;

const COLUMNS: &str = "domain VARCHAR(100), keyword VARCHAR(100), language VARCHAR(100)";

/// Prefix counter for test isolation.
static PREFIX_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Get a prefix no other test run uses.
fn unique_prefix() -> String {
    format!(
        "dtit{}_{}_",
        std::process::id(),
        PREFIX_COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

/// Helper to connect and configure a manager with a fresh prefix.
async fn connect() -> Option<DynamicTables<PgBackend>> {
    let config = match ConnectionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("No database configured: {}", e);
            return None;
        }
    };

    let mut tables = match timeout(Duration::from_secs(5), DynamicTables::connect(&config)).await {
        Ok(Ok(tables)) => tables,
        Ok(Err(e)) => {
            eprintln!("Connection failed: {}", e);
            return None;
        }
        Err(_) => {
            eprintln!("Connection timed out");
            return None;
        }
    };

    tables.set_table_prefix(&unique_prefix());
    tables.set_columns(COLUMNS);
    tables.set_dynamic_column("domain");
    Some(tables)
}

#[tokio::test]
async fn test_route_and_read_back() {
    let Some(mut tables) = connect().await else {
        eprintln!("Skipping test - could not connect to server");
        return;
    };
    let table = tables.format_table_name("wikipedia.org");

    assert_eq!(tables.input(["wikipedia.org", "cats", "en"]).await, 1);
    assert_eq!(tables.input(["wikipedia.org", "dogs", "en"]).await, 1);

    let rows = tables.rows(&table).await.expect("rows failed");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][2], Value::from("cats"));

    let columns = tables.columns(&table).await.expect("columns failed");
    let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "domain", "keyword", "language"]);

    tables.try_delete_tables().await.expect("cleanup failed");
    tables.close().await.expect("close failed");
}

#[tokio::test]
async fn test_delete_is_prefix_scoped() {
    let Some(mut tables) = connect().await else {
        eprintln!("Skipping test - could not connect to server");
        return;
    };
    let own_prefix = tables.layout().table_prefix().to_string();
    let other_prefix = unique_prefix();

    tables.input(["wikipedia.org", "cats", "en"]).await;
    tables.input(["google.com", "maps", "en"]).await;
    tables.set_table_prefix(&other_prefix);
    tables.input(["wikipedia.org", "dogs", "de"]).await;

    tables.set_table_prefix(&own_prefix);
    let report = tables.try_delete_tables().await.expect("delete failed");
    assert_eq!(report.count(), 2);

    let remaining = tables.tables().await.expect("tables failed");
    assert!(!remaining.iter().any(|t| t.starts_with(&own_prefix)));
    assert!(remaining.contains(&format!("{}wikipediaorg", other_prefix)));

    tables.set_table_prefix(&other_prefix);
    tables.try_delete_tables().await.expect("cleanup failed");
    tables.close().await.expect("close failed");
}

#[tokio::test]
async fn test_failed_insert_is_absorbed() {
    let Some(mut tables) = connect().await else {
        eprintln!("Skipping test - could not connect to server");
        return;
    };

    // too long for VARCHAR(100)
    let keyword = "k".repeat(200);
    assert_eq!(tables.input(["a.org", keyword.as_str(), "en"]).await, 0);
    assert_eq!(tables.stats().insert_failures, 1);
    assert_eq!(tables.input(["a.org", "short", "en"]).await, 1);

    let err = tables.try_input(["a.org", "short"]).await.unwrap_err();
    assert!(matches!(err, TableError::ArityMismatch { .. }));

    tables.try_delete_tables().await.expect("cleanup failed");
    tables.close().await.expect("close failed");
}

#[tokio::test]
async fn test_typed_columns() {
    let Some(mut tables) = connect().await else {
        eprintln!("Skipping test - could not connect to server");
        return;
    };
    tables.set_columns("shop VARCHAR(50), price NUMERIC(10, 2), seen DATE, hits INT");
    tables.set_dynamic_column("shop");
    let table = tables.format_table_name("shop.com");

    // strings are cast to NUMERIC, DATE and INT server-side
    let outcome = tables
        .try_input(["shop.com", "9.99", "2024-01-31", "1234"])
        .await
        .expect("typed insert failed");
    assert_eq!(outcome.rows_affected, 1);
    let rows = tables.rows(&table).await.expect("rows failed");
    assert_eq!(rows[0][4], Value::Integer(1234));

    let err = tables
        .try_input(["shop.com", "not a number", "2024-01-31", "1"])
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::Insert { .. }));

    // a bool has no INT encoding
    let err = tables
        .try_input([
            Value::from("shop.com"),
            Value::from("1.00"),
            Value::Null,
            Value::Boolean(true),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::Insert { .. }));
    assert_eq!(tables.rows(&table).await.expect("rows failed").len(), 1);

    tables.try_delete_tables().await.expect("cleanup failed");
    tables.close().await.expect("close failed");
}

#[tokio::test]
async fn test_atomic_input_rolls_back_create() {
    let Some(mut tables) = connect().await else {
        eprintln!("Skipping test - could not connect to server");
        return;
    };
    let table = tables.format_table_name("b.org");

    let keyword = "k".repeat(200);
    assert!(tables
        .try_input_atomic(["b.org", keyword.as_str(), "en"])
        .await
        .is_err());
    let existing = tables.tables().await.expect("tables failed");
    assert!(!existing.contains(&table));

    tables.close().await.expect("close failed");
}
