//! Schema introspection module.
//!
//! This module reads the SQLite catalog: `sqlite_master` plus the pragma
//! table-valued functions, always with the table name as a bound parameter.
//!
//! # Architecture
//!
//! SQL text lives in the `queries` submodule; `SchemaInspector` runs it and
//! builds the model types. Nothing is cached, every call reads the live catalog.

use crate::db::Database;
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnDefinition, ForeignKey, ForeignKeyAction, IndexInfo, SchemaMap, TableInfo, TableSchema,
    TableType,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

mod queries {
    pub const LIST_TABLES_WITH_VIEWS: &str = r#"
        SELECT name, type FROM sqlite_master
        WHERE type IN ('table', 'view')
        AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
        ORDER BY name
        "#;

    pub const LIST_TABLES_NO_VIEWS: &str = r#"
        SELECT name, type FROM sqlite_master
        WHERE type = 'table'
        AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
        ORDER BY name
        "#;

    /// Canonical name of a table or view, matched the way SQLite resolves names.
    pub const FIND_TABLE: &str = r#"
        SELECT name FROM sqlite_master
        WHERE type IN ('table', 'view')
        AND name = ? COLLATE NOCASE
        "#;

    pub const TABLE_SQL: &str = r#"
        SELECT name, sql FROM sqlite_master
        WHERE type = 'table'
        AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
        ORDER BY name
        "#;

    pub const COLUMNS: &str = "SELECT * FROM pragma_table_info(?) ORDER BY cid";

    pub const FOREIGN_KEYS: &str = "SELECT * FROM pragma_foreign_key_list(?) ORDER BY id, seq";

    pub const INDEXES: &str = "SELECT * FROM pragma_index_list(?) ORDER BY name";

    pub const INDEX_COLUMNS: &str = "SELECT name FROM pragma_index_info(?) ORDER BY seqno";
}

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List user tables (and optionally views), ordered by name.
    pub async fn list_tables(db: &Database, include_views: bool) -> DbResult<Vec<TableInfo>> {
        let pool = db.pool()?;
        let query = if include_views {
            queries::LIST_TABLES_WITH_VIEWS
        } else {
            queries::LIST_TABLES_NO_VIEWS
        };

        let rows = sqlx::query(query).fetch_all(pool).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name")?;
            let type_str: String = row.try_get("type")?;
            tables.push(TableInfo::new(name, TableType::parse(&type_str)));
        }

        debug!(count = tables.len(), include_views, "Listed tables");
        Ok(tables)
    }

    /// Describe a table's columns, keys, and indexes.
    ///
    /// Returns `DbError::TableNotFound` when no table or view has that name.
    pub async fn describe_table(db: &Database, table_name: &str) -> DbResult<TableSchema> {
        let pool = db.pool()?;

        let name: Option<String> = sqlx::query_scalar(queries::FIND_TABLE)
            .bind(table_name)
            .fetch_optional(pool)
            .await?;
        let Some(name) = name else {
            return Err(DbError::table_not_found(table_name));
        };

        let (columns, primary_key) = fetch_columns(pool, &name).await?;
        let foreign_keys = fetch_foreign_keys(pool, &name).await?;
        let indexes = fetch_indexes(pool, &name).await?;

        debug!(
            table = %name,
            columns = columns.len(),
            foreign_keys = foreign_keys.len(),
            indexes = indexes.len(),
            "Described table"
        );

        Ok(TableSchema {
            table_name: name,
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    /// Map every user table to its stored `CREATE TABLE` text.
    pub async fn get_schema(db: &Database) -> DbResult<SchemaMap> {
        let pool = db.pool()?;
        let rows = sqlx::query(queries::TABLE_SQL).fetch_all(pool).await?;

        let mut schema = SchemaMap::new();
        for row in &rows {
            let name: String = row.try_get("name")?;
            let sql: Option<String> = row.try_get("sql")?;
            schema.insert(name, sql);
        }

        debug!(count = schema.len(), "Read schema");
        Ok(schema)
    }
}

/// Columns in declaration order, plus the primary key columns in key order.
async fn fetch_columns(
    pool: &SqlitePool,
    table_name: &str,
) -> DbResult<(Vec<ColumnDefinition>, Vec<String>)> {
    let rows = sqlx::query(queries::COLUMNS)
        .bind(table_name)
        .fetch_all(pool)
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    let mut keyed = Vec::new();
    for row in &rows {
        let (column, pk) = column_from_row(row)?;
        if pk > 0 {
            keyed.push((pk, column.name.clone()));
        }
        columns.push(column);
    }

    Ok((columns, primary_key_order(keyed)))
}

/// `pk` is the 1-based position of the column in the key, 0 when not part of it.
fn column_from_row(row: &SqliteRow) -> DbResult<(ColumnDefinition, i64)> {
    let name: String = row.try_get("name")?;
    let data_type: String = row.try_get("type")?;
    let notnull: i64 = row.try_get("notnull")?;
    let default_value: Option<String> = row.try_get("dflt_value")?;
    let pk: i64 = row.try_get("pk")?;

    let mut col = ColumnDefinition::new(name, data_type, notnull == 0).with_primary_key(pk > 0);
    if let Some(ref def) = default_value {
        col = col.with_default_str(def);
    }
    Ok((col, pk))
}

fn primary_key_order(mut keyed: Vec<(i64, String)>) -> Vec<String> {
    keyed.sort_by_key(|(pk, _)| *pk);
    keyed.into_iter().map(|(_, name)| name).collect()
}

async fn fetch_foreign_keys(pool: &SqlitePool, table_name: &str) -> DbResult<Vec<ForeignKey>> {
    let rows = sqlx::query(queries::FOREIGN_KEYS)
        .bind(table_name)
        .fetch_all(pool)
        .await?;

    let mut foreign_keys = Vec::with_capacity(rows.len());
    for row in &rows {
        let column: String = row.try_get("from")?;
        let ref_table: String = row.try_get("table")?;
        let ref_column: Option<String> = row.try_get("to")?;
        let on_delete: String = row.try_get("on_delete").unwrap_or_default();
        let on_update: String = row.try_get("on_update").unwrap_or_default();

        foreign_keys.push(
            ForeignKey::new(column, ref_table, ref_column)
                .with_on_delete(ForeignKeyAction::parse(&on_delete))
                .with_on_update(ForeignKeyAction::parse(&on_update)),
        );
    }
    Ok(foreign_keys)
}

async fn fetch_indexes(pool: &SqlitePool, table_name: &str) -> DbResult<Vec<IndexInfo>> {
    let idx_list = sqlx::query(queries::INDEXES)
        .bind(table_name)
        .fetch_all(pool)
        .await?;

    let mut indexes = Vec::with_capacity(idx_list.len());
    for idx_row in &idx_list {
        let name: String = idx_row.try_get("name")?;
        let is_unique: i64 = idx_row.try_get("unique")?;
        let origin: String = idx_row.try_get("origin").unwrap_or_default();

        let columns = fetch_index_columns(pool, &name).await?;
        indexes.push(
            IndexInfo::new(name, columns)
                .with_unique(is_unique != 0)
                .with_primary(origin == "pk"),
        );
    }
    Ok(indexes)
}

/// Indexed column names. Expression terms have no name and are left out, so an
/// index over expressions only has an empty list.
async fn fetch_index_columns(pool: &SqlitePool, index_name: &str) -> DbResult<Vec<String>> {
    let names: Vec<Option<String>> = sqlx::query_scalar(queries::INDEX_COLUMNS)
        .bind(index_name)
        .fetch_all(pool)
        .await?;
    Ok(names.into_iter().flatten().collect())
}
