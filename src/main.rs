//! SQLite MCP Server - Main entry point.
//!
//! This server provides read-only MCP (Model Context Protocol) tools for AI
//! assistants to explore and query a local SQLite database.

use clap::Parser;
use sqlite_mcp_server::config::{Config, TransportMode};
use sqlite_mcp_server::db::Database;
use sqlite_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the stdio protocol stream.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    let db_config = config.database_config()?;

    if !db_config.path().is_file() {
        eprintln!(
            "Error: Database file not found: {}",
            db_config.path().display()
        );
        eprintln!();
        eprintln!("Create the database first (for example with the seed script), or point");
        eprintln!("the server at an existing file:");
        eprintln!();
        eprintln!("  sqlite-mcp-server --database path/to/file.db");
        eprintln!("  MCP_DATABASE=sqlite:path/to/file.db sqlite-mcp-server");
        std::process::exit(1);
    }

    info!(
        transport = %config.transport,
        database = %db_config.path().display(),
        "Starting SQLite MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let database = Arc::new(Database::connect(db_config).await?);

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(database);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                database,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
