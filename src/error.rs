//! Error types for the SQLite MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each error variant provides actionable messages to help AI assistants understand
//! and recover from error conditions. Every variant ends at the tool boundary as a
//! structured MCP error; none of them terminate the server.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// The read-only gate refused the statement.
    #[error("Query rejected ({rule}): {reason}")]
    Validation { rule: &'static str, reason: String },

    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// SQLite refused the statement (syntax, missing object, type mismatch).
    #[error("SQL error: {message}")]
    Database {
        message: String,
        /// SQLite extended result code, e.g. "1" for SQLITE_ERROR
        code: Option<String>,
        suggestion: String,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a validation error for a gate rejection.
    pub fn validation(rule: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            rule,
            reason: reason.into(),
        }
    }

    /// Create a table not found error.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Create a database error with an optional SQLite result code.
    pub fn database(
        message: impl Into<String>,
        code: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            code,
            suggestion: suggestion.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::Validation { .. } => {
                Some("Only read-only SELECT or WITH queries are accepted by this tool")
            }
            Self::TableNotFound { .. } => Some("Call list_tables to see the available tables"),
            Self::Timeout { .. } => Some("Narrow the query with WHERE or LIMIT"),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the database path or sqlite: URL",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced tables/columns with describe_table",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a database connection from the pool",
                "All connections are busy; retry, or raise --max-connections",
            ),
            sqlx::Error::PoolClosed => DbError::connection(
                "Connection pool is closed",
                "The server is shutting down; retry after restart",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check that the database file exists and is readable",
            ),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::internal(format!("Column not found in result: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            // Caller-correctable: bad statement or bad arguments
            DbError::Validation { .. } | DbError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::TableNotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            // Database errors -> invalid_params with result code in message
            DbError::Database { code, .. } => {
                let msg = match code {
                    Some(code) => format!("{} (SQLite code: {})", err, code),
                    None => err.to_string(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            DbError::Connection { .. } | DbError::Timeout { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to open crm.db", "Check the path");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_validation_display_names_rule() {
        let err = DbError::validation("forbidden_keyword", "found DELETE");
        let msg = err.to_string();
        assert!(msg.contains("forbidden_keyword"));
        assert!(msg.contains("DELETE"));
    }

    #[test]
    fn test_table_not_found_display() {
        let err = DbError::table_not_found("nope");
        assert_eq!(err.to_string(), "Table 'nope' not found");
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database("near \"SELEC\": syntax error", Some("1".into()), "Check SQL");
        assert_eq!(err.suggestion(), Some("Check SQL"));
        assert!(DbError::internal("x").suggestion().is_none());
    }

    // Tests for From<DbError> for rmcp::ErrorData

    #[test]
    fn test_validation_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::validation("prefix", "bad").into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::invalid_input("empty table name").into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_table_not_found_maps_to_resource_not_found() {
        let mcp_err: rmcp::ErrorData = DbError::table_not_found("ghost").into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_connection_maps_to_internal_error() {
        let mcp_err: rmcp::ErrorData = DbError::connection("failed", "try again").into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_timeout_maps_to_internal_error() {
        let mcp_err: rmcp::ErrorData = DbError::timeout("query execution", 30).into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_pool_timeout_does_not_claim_a_duration() {
        let err = DbError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DbError::Connection { .. }));
        let msg = err.to_string();
        assert!(msg.contains("Timed out waiting for a database connection"));
        assert!(!msg.contains("30s"));
        assert!(err.suggestion().unwrap().contains("--max-connections"));
    }

    #[test]
    fn test_database_error_includes_code() {
        let err = DbError::database("no such table: ghosts", Some("1".to_string()), "check");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32602);
        assert!(mcp_err.message.contains("no such table: ghosts"));
        assert!(mcp_err.message.contains("SQLite code: 1"));
    }

    #[test]
    fn test_connection_error_includes_suggestion_in_data() {
        let err = DbError::connection("failed", "try reconnecting");
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "try reconnecting");
    }

    #[test]
    fn test_internal_error_has_no_data() {
        let mcp_err: rmcp::ErrorData = DbError::internal("boom").into();
        assert!(mcp_err.data.is_none());
    }
}
