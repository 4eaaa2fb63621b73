//! SQLite MCP Server Library
//!
//! This library provides read-only MCP (Model Context Protocol) tools for AI
//! assistants to explore and query a local SQLite database.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::Database;
pub use error::DbError;
pub use mcp::SqliteService;
