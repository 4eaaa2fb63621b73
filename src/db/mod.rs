//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Read-only connection pool management
//! - Query execution
//! - Schema introspection
//! - Type mappings

pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::Database;
pub use schema::SchemaInspector;
