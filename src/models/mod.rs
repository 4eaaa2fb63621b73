//! Data models for the SQLite MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

// Re-export commonly used types
pub use query::{ColumnMetadata, QueryResult, Row};
pub use schema::{
    ColumnDefinition, ForeignKey, ForeignKeyAction, IndexInfo, SchemaMap, TableInfo, TableSchema,
    TableType,
};
