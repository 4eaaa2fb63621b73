//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: Execute a gated SELECT query
//! - `list_tables`: List tables in the database
//! - `describe_table`: Get table schema information
//! - `get_schema`: CREATE statements for every table
//! - `sql_validator`: SQL statement validation for read-only enforcement

pub mod query;
pub mod schema;
pub mod sql_validator;

pub use query::{QueryInput, QueryOutput, QueryToolHandler};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, GetSchemaOutput, ListTablesInput, ListTablesOutput,
    SchemaToolHandler,
};
