//! Query execution tool.
//!
//! This module implements the `query` MCP tool for executing SELECT queries.
//! Statements go through the read-only gate first; rejected statements never
//! reach the database.

use crate::db::{Database, QueryExecutor};
use crate::error::DbResult;
use crate::models::{QueryResult, Row};
use crate::tools::sql_validator;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// A single SELECT (or WITH ... SELECT) statement. Write and administrative statements are rejected.
    pub sql: String,
}

/// Output from the query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Result column names, in order (present even when no rows match)
    pub columns: Vec<String>,
    /// Each row is a list of values aligned with `columns`; BLOBs are UTF-8 text or base64
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self {
            columns: result.column_names(),
            row_count: result.row_count(),
            rows: result.rows,
            execution_time_ms: result.execution_time_ms,
        }
    }
}

/// Handler for query execution.
pub struct QueryToolHandler {
    database: Arc<Database>,
    executor: QueryExecutor,
}

impl QueryToolHandler {
    /// Create a new query tool handler.
    pub fn new(database: Arc<Database>) -> Self {
        let executor = QueryExecutor::for_database(&database);
        Self { database, executor }
    }

    /// Create a new query tool handler with custom executor settings.
    pub fn with_executor(database: Arc<Database>, executor: QueryExecutor) -> Self {
        Self { database, executor }
    }

    /// Handle the query tool call.
    ///
    /// The statement text is executed exactly as received once the gate admits it.
    pub async fn query(&self, input: QueryInput) -> DbResult<QueryOutput> {
        if let Err(err) = sql_validator::validate_readonly(&input.sql) {
            warn!(
                database = %self.database.name(),
                error = %err,
                "Query rejected"
            );
            return Err(err);
        }

        let result = self
            .executor
            .execute_query(&self.database, &input.sql)
            .await?;

        info!(
            database = %self.database.name(),
            row_count = result.row_count(),
            execution_time_ms = result.execution_time_ms,
            "Query executed"
        );

        Ok(result.into())
    }
}
