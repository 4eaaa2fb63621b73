//! Connection pool management.
//!
//! This module owns the single read-only `SqlitePool` every tool call runs
//! against. Each pooled connection is opened with `SQLITE_OPEN_READONLY`, so no
//! write-capable session ever reaches the query path.

use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Handle to the configured SQLite database.
#[derive(Debug)]
pub struct Database {
    pool: SqlitePool,
    config: DatabaseConfig,
    sqlite_version: Option<String>,
}

impl Database {
    /// Open a read-only pool on the configured file.
    ///
    /// The file must already exist; it is never created.
    pub async fn connect(config: DatabaseConfig) -> DbResult<Self> {
        ensure_file_exists(config.path())?;

        info!(
            database = %config.path().display(),
            max_connections = config.pool_options.max_connections_or_default(),
            "Opening database read-only"
        );

        let pool = create_pool(&config).await?;
        let sqlite_version = get_sqlite_version(&pool).await;

        info!(
            database = %config.display_name(),
            sqlite_version = ?sqlite_version,
            "Connected successfully"
        );

        Ok(Self {
            pool,
            config,
            sqlite_version,
        })
    }

    /// Get the pool, after checking the database file is still present.
    ///
    /// SQLite keeps serving an unlinked file through already-open handles;
    /// the check reports the missing file instead of stale data.
    pub fn pool(&self) -> DbResult<&SqlitePool> {
        ensure_file_exists(self.config.path())?;
        Ok(&self.pool)
    }

    pub fn path(&self) -> &Path {
        self.config.path()
    }

    /// File name for log lines.
    pub fn name(&self) -> String {
        self.config.display_name()
    }

    pub fn query_timeout(&self) -> Duration {
        self.config.query_timeout
    }

    pub fn sqlite_version(&self) -> Option<&str> {
        self.sqlite_version.as_deref()
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        info!(database = %self.name(), "Closing connection pool");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn ensure_file_exists(path: &Path) -> DbResult<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(DbError::connection(
        format!("Database file not found: {}", path.display()),
        "Create the database first (for example with the seed script) or pass --database <PATH>",
    ))
}

/// Create the read-only connection pool for the given configuration.
async fn create_pool(config: &DatabaseConfig) -> DbResult<SqlitePool> {
    let pool_opts = &config.pool_options;
    let acquire_timeout = Duration::from_secs(pool_opts.acquire_timeout_or_default());
    let idle_timeout = Some(Duration::from_secs(pool_opts.idle_timeout_or_default()));

    let options = SqliteConnectOptions::new()
        .filename(config.path())
        .read_only(true)
        .create_if_missing(false);

    SqlitePoolOptions::new()
        .min_connections(pool_opts.min_connections_or_default())
        .max_connections(pool_opts.max_connections_or_default())
        .acquire_timeout(acquire_timeout)
        .idle_timeout(idle_timeout)
        .test_before_acquire(pool_opts.test_before_acquire_or_default())
        .connect_with(options)
        .await
        .map_err(|e| {
            DbError::connection(
                format!("Failed to open {}: {}", config.path().display(), e),
                connection_suggestion(&e),
            )
        })
}

async fn get_sqlite_version(pool: &SqlitePool) -> Option<String> {
    match sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
        .fetch_one(pool)
        .await
    {
        Ok(version) => {
            debug!(version = %version, "Got SQLite version");
            Some(version)
        }
        Err(e) => {
            warn!(error = %e, "Failed to get SQLite version");
            None
        }
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("not a database") || error_str.contains("malformed") {
        return "The file exists but is not a valid SQLite database".to_string();
    }

    if error_str.contains("unable to open") || error_str.contains("permission") {
        return "Check that the file is readable by the server process".to_string();
    }

    "Verify the file path exists and is accessible: --database path/to/file.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::ConnectOptions;
    use tempfile::TempDir;

    async fn seed(path: &Path) {
        let mut conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connect_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::parse(dir.path().join("absent.db").to_str().unwrap()).unwrap();

        let result = Database::connect(config).await;
        assert!(matches!(result, Err(DbError::Connection { .. })));
        // Never created as a side effect
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn test_connect_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crm.db");
        seed(&path).await;

        let db = Database::connect(DatabaseConfig::parse(path.to_str().unwrap()).unwrap())
            .await
            .unwrap();
        assert!(db.sqlite_version().is_some());
        assert_eq!(db.name(), "crm.db");
        assert!(db.pool().is_ok());

        db.close().await;
        assert!(db.is_closed());
    }

    #[tokio::test]
    async fn test_pool_reports_removed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crm.db");
        seed(&path).await;

        let db = Database::connect(DatabaseConfig::parse(path.to_str().unwrap()).unwrap())
            .await
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = db.pool().unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_pool_is_read_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crm.db");
        seed(&path).await;

        let db = Database::connect(DatabaseConfig::parse(path.to_str().unwrap()).unwrap())
            .await
            .unwrap();
        let result = sqlx::query("INSERT INTO users (name) VALUES ('x')")
            .execute(db.pool().unwrap())
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_connection_suggestion_default() {
        let err = sqlx::Error::PoolTimedOut;
        assert!(connection_suggestion(&err).contains("--database"));
    }
}
