//! MCP service implementation using rmcp.
//!
//! This module defines the SqliteService struct with all database tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::db::Database;
use crate::tools::query::{QueryInput, QueryOutput, QueryToolHandler};
use crate::tools::schema::{
    DescribeTableInput, DescribeTableOutput, GetSchemaOutput, ListTablesInput, ListTablesOutput,
    SchemaToolHandler,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct SqliteService {
    /// Shared read-only database handle
    database: Arc<Database>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl SqliteService {
    /// Create a new SqliteService instance over a shared database handle.
    pub fn new(database: Arc<Database>) -> Self {
        Self {
            database,
            tool_router: Self::tool_router(),
        }
    }

    fn schema_handler(&self) -> SchemaToolHandler {
        SchemaToolHandler::new(self.database.clone())
    }
}

#[tool_router]
impl SqliteService {
    #[tool(
        description = "List all tables in the database, in alphabetical order.\nSet include_views to also list views."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        self.schema_handler()
            .list_tables(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Get the structure of a table.\nReturns columns (name, declared type, nullable, default, primary key), foreign keys, and indexes."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<DescribeTableOutput>, McpError> {
        self.schema_handler()
            .describe_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Get the CREATE TABLE statement of every table, exactly as stored by SQLite.\nUseful for understanding relationships before writing a query."
    )]
    async fn get_schema(&self) -> Result<Json<GetSchemaOutput>, McpError> {
        self.schema_handler()
            .get_schema()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Execute a read-only SQL query and return the results.\nOnly a single statement starting with SELECT or WITH is accepted.\nINSERT, UPDATE, DELETE, DROP, ALTER, CREATE, REPLACE, ATTACH, DETACH, PRAGMA, VACUUM, TRUNCATE and REINDEX are rejected as whole words anywhere in the text, including inside string literals."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        QueryToolHandler::new(self.database.clone())
            .query(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for SqliteService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sqlite-mcp-server".to_owned(),
                title: Some("SQLite MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only tools for exploring and querying a SQLite database.\n\
                \n\
                ## Workflow\n\
                1. Call `list_tables` to see which tables exist\n\
                2. Call `describe_table` (or `get_schema` for everything at once) to learn columns and relationships\n\
                3. Call `query` with a single SELECT or WITH statement\n\
                \n\
                ## Query Rules\n\
                - The statement must start with SELECT or WITH\n\
                - Write and administrative keywords (INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, REPLACE, \
                ATTACH, DETACH, PRAGMA, VACUUM, TRUNCATE, REINDEX) are rejected as whole words anywhere, \
                including inside string literals; column names like `created_at` are fine\n\
                - One statement per call; a single trailing `;` is allowed\n\
                - Leading comments are not allowed\n\
                \n\
                ## Results\n\
                Rows are lists of values aligned with `columns`. BLOB values are returned as UTF-8 text \
                when valid, otherwise base64."
                    .to_string(),
            ),
        }
    }
}
