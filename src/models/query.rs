//! Query-related data models.
//!
//! This module defines types for SQL query results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One result row, positionally aligned with [`QueryResult::columns`].
pub type Row = Vec<JsonValue>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Declared type of the source column when SQLite knows it (e.g. "TEXT"), else "NULL"
    pub type_name: String,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Row>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a result with no rows, keeping the column list.
    pub fn empty(columns: Vec<ColumnMetadata>, execution_time_ms: u64) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            execution_time_ms,
        }
    }

    /// Ordered column names.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
