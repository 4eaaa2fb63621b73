//! Query execution engine.
//!
//! This module runs statements that already passed the read-only gate:
//! - Column names come from preparing the statement, so empty results keep them
//! - Every row is fetched (no row limit)
//! - Execution is bounded by the configured query timeout

use crate::db::Database;
use crate::db::types::{row_column_metadata, row_to_values};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnMetadata, QueryResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Executor, Statement, TypeInfo};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Query executor that handles database query execution.
pub struct QueryExecutor {
    timeout: Duration,
}

impl QueryExecutor {
    /// Create an executor bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Create an executor with the database's configured timeout.
    pub fn for_database(db: &Database) -> Self {
        Self::new(db.query_timeout())
    }

    /// Execute a SELECT query and return results.
    ///
    /// `sql` is sent to SQLite exactly as given.
    pub async fn execute_query(&self, db: &Database, sql: &str) -> DbResult<QueryResult> {
        let pool = db.pool()?;
        let start = Instant::now();

        debug!(
            sql = %sql,
            timeout_secs = self.timeout.as_secs(),
            "Executing query"
        );

        let fetch = async {
            let mut conn = pool.acquire().await?;
            let columns = {
                let statement = (&mut *conn).prepare(sql).await?;
                statement
                    .columns()
                    .iter()
                    .map(|col| ColumnMetadata::new(col.name(), col.type_info().name()))
                    .collect::<Vec<_>>()
            };
            let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
            Ok::<_, sqlx::Error>((columns, rows))
        };

        let (columns, rows) = match timeout(self.timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => return Err(timeout_error("query execution", self.timeout)),
        };

        Ok(process_rows(columns, rows, start))
    }
}

/// Convert fetched rows into a QueryResult.
fn process_rows(columns: Vec<ColumnMetadata>, rows: Vec<SqliteRow>, start: Instant) -> QueryResult {
    let columns = match rows.first() {
        Some(first) if columns.is_empty() => row_column_metadata(first),
        _ => columns,
    };

    let rows: Vec<_> = rows.iter().map(row_to_values).collect();
    let execution_time_ms = start.elapsed().as_millis() as u64;

    debug!(
        rows = rows.len(),
        execution_time_ms = execution_time_ms,
        "Query complete"
    );

    QueryResult {
        columns,
        rows,
        execution_time_ms,
    }
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use sqlx::ConnectOptions;
    use sqlx::sqlite::SqliteConnectOptions;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> Database {
        let path = dir.path().join("crm.db");
        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE deals (id INTEGER PRIMARY KEY, title TEXT NOT NULL, value REAL, stage TEXT)",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO deals (title, value, stage) VALUES ('A', 1000.0, 'Lead'), ('B', 2500.5, 'Closed Won')",
        )
        .execute(&mut conn)
        .await
        .unwrap();

        Database::connect(DatabaseConfig::parse(path.to_str().unwrap()).unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_timeout_error_reports_seconds() {
        let err = timeout_error("query execution", Duration::from_secs(7));
        assert!(matches!(
            err,
            DbError::Timeout {
                elapsed_secs: 7,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_execute_query_rows_in_column_order() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let executor = QueryExecutor::for_database(&db);

        let result = executor
            .execute_query(&db, "SELECT title, value FROM deals ORDER BY id")
            .await
            .unwrap();
        assert_eq!(result.column_names(), vec!["title", "value"]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(
            result.rows[1],
            vec![serde_json::json!("B"), serde_json::json!(2500.5)]
        );
    }

    #[tokio::test]
    async fn test_execute_query_empty_result_keeps_columns() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let executor = QueryExecutor::for_database(&db);

        let result = executor
            .execute_query(&db, "SELECT id, stage FROM deals WHERE value > 1e9")
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.column_names(), vec!["id", "stage"]);
    }

    #[tokio::test]
    async fn test_execute_query_engine_error() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let executor = QueryExecutor::for_database(&db);

        let err = executor
            .execute_query(&db, "SELECT nope FROM deals")
            .await
            .unwrap_err();
        match err {
            DbError::Database { message, .. } => assert!(message.contains("no such column")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
