//! Schema introspection tools.
//!
//! This module implements the `list_tables`, `describe_table`, and `get_schema` MCP tools.

use crate::db::Database;
use crate::db::schema::SchemaInspector;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDefinition, ForeignKey, IndexInfo, SchemaMap, TableSchema, TableType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Also list views, in a separate `views` field. Default: false
    #[serde(default)]
    pub include_views: bool,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    /// Table names, in alphabetical order
    pub tables: Vec<String>,
    /// Number of tables (views not counted)
    pub count: usize,
    /// View names, present only when include_views was set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<Vec<String>>,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Name of the table to describe (from list_tables)
    pub table_name: String,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    /// Name of the described table
    pub table: String,
    /// Column definitions in declaration order
    pub columns: Vec<ColumnOutput>,
    /// Column names that form the primary key
    pub primary_key: Vec<String>,
    /// Foreign key relationships to other tables
    pub foreign_keys: Vec<ForeignKeyOutput>,
    /// Index definitions on the table
    pub indexes: Vec<IndexOutput>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnOutput {
    pub name: String,
    /// Declared type exactly as written (e.g. "TEXT", "VARCHAR(64)", or "" when untyped)
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    /// Default value with appropriate JSON type; expressions such as CURRENT_TIMESTAMP as text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    pub primary_key: bool,
}

impl From<ColumnDefinition> for ColumnOutput {
    fn from(col: ColumnDefinition) -> Self {
        Self {
            name: col.name,
            data_type: col.data_type,
            nullable: col.nullable,
            default: col.default_value,
            primary_key: col.is_primary_key,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ForeignKeyOutput {
    pub column: String,
    pub references_table: String,
    /// Null when the key implicitly targets the referenced table's primary key
    pub references_column: Option<String>,
    /// CASCADE, SET NULL, SET DEFAULT, RESTRICT, or NO ACTION
    pub on_delete: String,
    /// CASCADE, SET NULL, SET DEFAULT, RESTRICT, or NO ACTION
    pub on_update: String,
}

impl From<ForeignKey> for ForeignKeyOutput {
    fn from(fk: ForeignKey) -> Self {
        Self {
            column: fk.column,
            references_table: fk.references_table,
            references_column: fk.references_column,
            on_delete: fk.on_delete.to_string(),
            on_update: fk.on_update.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct IndexOutput {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    /// Backs the table's PRIMARY KEY
    pub primary: bool,
}

impl From<IndexInfo> for IndexOutput {
    fn from(idx: IndexInfo) -> Self {
        Self {
            name: idx.name,
            columns: idx.columns,
            unique: idx.is_unique,
            primary: idx.is_primary,
        }
    }
}

impl From<TableSchema> for DescribeTableOutput {
    fn from(schema: TableSchema) -> Self {
        Self {
            table: schema.table_name,
            columns: schema.columns.into_iter().map(Into::into).collect(),
            primary_key: schema.primary_key,
            foreign_keys: schema.foreign_keys.into_iter().map(Into::into).collect(),
            indexes: schema.indexes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Output from the get_schema tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GetSchemaOutput {
    /// Table name to its CREATE TABLE statement, verbatim
    pub schema: SchemaMap,
    pub count: usize,
}

pub struct SchemaToolHandler {
    database: Arc<Database>,
}

impl SchemaToolHandler {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let entries = SchemaInspector::list_tables(&self.database, input.include_views).await?;

        let (tables, views): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|t| t.table_type == TableType::Table);
        let tables: Vec<String> = tables.into_iter().map(|t| t.name).collect();
        let count = tables.len();

        info!(
            database = %self.database.name(),
            count = count,
            views = views.len(),
            "Listed tables"
        );

        Ok(ListTablesOutput {
            tables,
            count,
            views: input
                .include_views
                .then(|| views.into_iter().map(|v| v.name).collect()),
        })
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let table_name = input.table_name.trim();
        if table_name.is_empty() {
            return Err(DbError::invalid_input(
                "table_name must not be empty. Call list_tables to see the available tables.",
            ));
        }

        let schema = SchemaInspector::describe_table(&self.database, table_name).await?;

        info!(
            database = %self.database.name(),
            table = %schema.table_name,
            columns = schema.columns.len(),
            "Described table"
        );

        Ok(schema.into())
    }

    pub async fn get_schema(&self) -> DbResult<GetSchemaOutput> {
        let schema = SchemaInspector::get_schema(&self.database).await?;
        let count = schema.len();

        info!(
            database = %self.database.name(),
            count = count,
            "Read schema"
        );

        Ok(GetSchemaOutput { schema, count })
    }
}
