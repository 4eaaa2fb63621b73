//! Configuration handling for the SQLite MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATABASE: &str = "crm.db";
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Connection pool configuration options.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum connections in pool (default: 4)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 1)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Whether to test connections before use (default: true)
    pub test_before_acquire: Option<bool>,
}

impl PoolOptions {
    pub fn max_connections_or_default(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    pub fn idle_timeout_or_default(&self) -> u64 {
        self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    pub fn acquire_timeout_or_default(&self) -> u64 {
        self.acquire_timeout_secs
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS)
    }

    pub fn test_before_acquire_or_default(&self) -> bool {
        self.test_before_acquire.unwrap_or(true)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("max_connections must be greater than 0".to_string());
            }
        }
        if let Some(min) = self.min_connections {
            if min == 0 {
                return Err("min_connections must be greater than 0".to_string());
            }
            if let Some(max) = self.max_connections {
                if min > max {
                    return Err(format!(
                        "min_connections ({}) cannot exceed max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Database file configuration resolved from CLI arguments.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite file. Never created; opened read-only.
    pub path: PathBuf,
    pub pool_options: PoolOptions,
    /// Upper bound on a single query's execution.
    pub query_timeout: Duration,
}

impl DatabaseConfig {
    /// Parse a database location from a CLI argument.
    ///
    /// # Format
    ///
    /// - `path/to/file.db` - bare filesystem path
    /// - `sqlite:path/to/file.db` or `sqlite://path/to/file.db` - URL form
    ///
    /// Query parameters on the URL form (`?mode=rwc`) are discarded; the
    /// connection mode is never taken from the argument.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlite_mcp_server::config::DatabaseConfig;
    ///
    /// let config = DatabaseConfig::parse("sqlite://data/crm.db").unwrap();
    /// assert_eq!(config.path.to_str(), Some("data/crm.db"));
    /// ```
    pub fn parse(s: &str) -> Result<Self, String> {
        let trimmed = s.trim();
        let raw = match trimmed.strip_prefix("sqlite:") {
            Some(rest) => {
                let rest = rest.strip_prefix("//").unwrap_or(rest);
                rest.split_once('?').map(|(p, _)| p).unwrap_or(rest)
            }
            None => trimmed,
        };

        if raw.is_empty() {
            return Err(format!(
                "Database path is empty in '{}'. Expected a file path such as 'crm.db'",
                s
            ));
        }
        if raw == ":memory:" {
            return Err(
                "In-memory databases are not supported; point --database at an existing file"
                    .to_string(),
            );
        }

        Ok(Self {
            path: PathBuf::from(raw),
            pool_options: PoolOptions::default(),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        })
    }

    /// Set the pool options.
    pub fn with_pool_options(mut self, pool_options: PoolOptions) -> Self {
        self.pool_options = pool_options;
        self
    }

    /// Set the query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in log lines and server info, e.g. `crm.db`.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Configuration for the SQLite MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sqlite-mcp-server",
    about = "Read-only MCP server - lets AI assistants explore and query a SQLite database",
    version,
    author
)]
pub struct Config {
    /// SQLite database file.
    /// Format: "path/to/file.db" or "sqlite:path/to/file.db"
    /// The file must already exist; it is always opened read-only.
    #[arg(
        short = 'd',
        long = "database",
        value_name = "PATH",
        default_value = DEFAULT_DATABASE,
        env = "MCP_DATABASE"
    )]
    pub database: String,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Maximum number of pooled read-only connections
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        env = "MCP_MAX_CONNECTIONS"
    )]
    pub max_connections: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output (disabled by default to avoid interfering with stdio transport)
    #[arg(long, env = "MCP_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Resolve the database configuration from the CLI arguments.
    pub fn database_config(&self) -> Result<DatabaseConfig, String> {
        let pool_options = PoolOptions {
            max_connections: Some(self.max_connections),
            ..PoolOptions::default()
        };
        pool_options.validate()?;

        if self.query_timeout == 0 {
            return Err("query_timeout must be greater than 0".to_string());
        }

        Ok(DatabaseConfig::parse(&self.database)?
            .with_pool_options(pool_options)
            .with_query_timeout(self.query_timeout_duration()))
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_parse_args_defaults() {
        let config = Config::parse_from(["sqlite-mcp-server"]);
        assert_eq!(config.database, "crm.db");
        assert_eq!(config.query_timeout, DEFAULT_QUERY_TIMEOUT_SECS);
    }

    #[test]
    fn test_parse_args_overrides() {
        let config = Config::parse_from([
            "sqlite-mcp-server",
            "-d",
            "/tmp/sales.db",
            "--transport",
            "http",
            "--http-port",
            "9000",
            "--max-connections",
            "2",
        ]);
        assert_eq!(config.database, "/tmp/sales.db");
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_timeout_duration() {
        let config = Config {
            query_timeout: 60,
            ..Config::default()
        };
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_transport_mode_display() {
        assert_eq!(TransportMode::Stdio.to_string(), "stdio");
        assert_eq!(TransportMode::Http.to_string(), "http");
    }

    #[test]
    fn test_parse_bare_path() {
        let config = DatabaseConfig::parse("crm.db").unwrap();
        assert_eq!(config.path, PathBuf::from("crm.db"));
        assert_eq!(config.display_name(), "crm.db");
    }

    #[test]
    fn test_parse_sqlite_url_forms() {
        let config = DatabaseConfig::parse("sqlite:data/crm.db").unwrap();
        assert_eq!(config.path, PathBuf::from("data/crm.db"));

        let config = DatabaseConfig::parse("sqlite:///var/lib/crm.db").unwrap();
        assert_eq!(config.path, PathBuf::from("/var/lib/crm.db"));
    }

    #[test]
    fn test_parse_url_query_params_discarded() {
        let config = DatabaseConfig::parse("sqlite:crm.db?mode=rwc").unwrap();
        assert_eq!(config.path, PathBuf::from("crm.db"));
    }

    #[test]
    fn test_parse_empty_path_rejected() {
        assert!(DatabaseConfig::parse("").is_err());
        assert!(DatabaseConfig::parse("sqlite:").is_err());
        assert!(DatabaseConfig::parse("sqlite://").is_err());
    }

    #[test]
    fn test_parse_memory_rejected() {
        assert!(DatabaseConfig::parse("sqlite::memory:").is_err());
    }

    #[test]
    fn test_database_config_carries_cli_settings() {
        let config = Config {
            database: "sales.db".to_string(),
            query_timeout: 5,
            max_connections: 2,
            ..Config::default()
        };
        let db = config.database_config().unwrap();
        assert_eq!(db.path, PathBuf::from("sales.db"));
        assert_eq!(db.query_timeout, Duration::from_secs(5));
        assert_eq!(db.pool_options.max_connections_or_default(), 2);
    }

    #[test]
    fn test_database_config_rejects_zero_connections() {
        let config = Config {
            max_connections: 0,
            ..Config::default()
        };
        let err = config.database_config().unwrap_err();
        assert!(err.contains("max_connections"));
    }

    #[test]
    fn test_database_config_rejects_zero_timeout() {
        let config = Config {
            query_timeout: 0,
            ..Config::default()
        };
        assert!(config.database_config().is_err());
    }

    #[test]
    fn test_pool_options_defaults() {
        let opts = PoolOptions::default();
        assert_eq!(opts.max_connections_or_default(), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(opts.min_connections_or_default(), DEFAULT_MIN_CONNECTIONS);
        assert_eq!(opts.idle_timeout_or_default(), DEFAULT_IDLE_TIMEOUT_SECS);
        assert_eq!(
            opts.acquire_timeout_or_default(),
            DEFAULT_ACQUIRE_TIMEOUT_SECS
        );
        assert!(opts.test_before_acquire_or_default());
    }

    #[test]
    fn test_pool_options_validation_min_exceeds_max() {
        let opts = PoolOptions {
            max_connections: Some(2),
            min_connections: Some(3),
            ..Default::default()
        };
        let err = opts.validate().unwrap_err();
        assert!(err.contains("cannot exceed"));
    }
}
