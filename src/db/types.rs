//! SQLite type mappings.
//!
//! This module maps SQLite values onto JSON.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies a type name by SQLite's affinity rules
//! 2. A decoder per category extracts the value
//!
//! SQLite is dynamically typed, so classification runs on the runtime
//! storage class of each value rather than the declared column type. A TEXT
//! value stored in an INTEGER column comes back as a string.

use crate::models::ColumnMetadata;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Column, Decode, Row, Sqlite, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for SQLite types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
    Null,
}

/// Classify a SQLite type name into a logical category.
///
/// Follows the column affinity rules of the SQLite documentation, in order:
/// "INT" → integer; "CHAR", "CLOB", "TEXT" → text; "BLOB" or no type → blob;
/// "REAL", "FLOA", "DOUB" → real; anything else → numeric.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_uppercase();

    if upper == "NULL" {
        return TypeCategory::Null;
    }

    if upper.contains("INT") {
        return TypeCategory::Integer;
    }

    if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        return TypeCategory::Text;
    }

    if upper.is_empty() || upper.contains("BLOB") {
        return TypeCategory::Blob;
    }

    if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        return TypeCategory::Real;
    }

    TypeCategory::Numeric
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Decode binary data to JSON value.
///
/// Valid UTF-8 is returned as text; anything else is base64 encoded.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

// =============================================================================
// Row Conversion
// =============================================================================

/// Convert a row into its values, in column order.
pub fn row_to_values(row: &SqliteRow) -> Vec<JsonValue> {
    (0..row.columns().len())
        .map(|idx| decode_column(row, idx))
        .collect()
}

/// Column metadata for a row's columns.
pub fn row_column_metadata(row: &SqliteRow) -> Vec<ColumnMetadata> {
    row.columns()
        .iter()
        .map(|col| ColumnMetadata::new(col.name(), col.type_info().name()))
        .collect()
}

/// Decode a single column by the runtime storage class of its value.
pub fn decode_column(row: &SqliteRow, idx: usize) -> JsonValue {
    let Ok(value) = row.try_get_raw(idx) else {
        return JsonValue::Null;
    };
    if value.is_null() {
        return JsonValue::Null;
    }

    let category = categorize_type(value.type_info().name());
    match category {
        TypeCategory::Null => JsonValue::Null,
        TypeCategory::Integer => decode_integer(value),
        TypeCategory::Real => decode_real(value),
        TypeCategory::Blob => decode_blob(value),
        TypeCategory::Numeric => decode_numeric(value),
        TypeCategory::Text => decode_text(value),
    }
}

fn decode_integer(value: SqliteValueRef<'_>) -> JsonValue {
    <i64 as Decode<Sqlite>>::decode(value)
        .map(|v| JsonValue::Number(v.into()))
        .unwrap_or(JsonValue::Null)
}

fn decode_real(value: SqliteValueRef<'_>) -> JsonValue {
    match <f64 as Decode<Sqlite>>::decode(value) {
        Ok(v) => float_to_json(v),
        Err(_) => JsonValue::Null,
    }
}

fn decode_blob(value: SqliteValueRef<'_>) -> JsonValue {
    <&[u8] as Decode<Sqlite>>::decode(value)
        .map(decode_binary_value)
        .unwrap_or(JsonValue::Null)
}

fn decode_numeric(value: SqliteValueRef<'_>) -> JsonValue {
    match <f64 as Decode<Sqlite>>::decode(value) {
        Ok(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            JsonValue::Number((v as i64).into())
        }
        Ok(v) => float_to_json(v),
        Err(_) => JsonValue::Null,
    }
}

fn decode_text(value: SqliteValueRef<'_>) -> JsonValue {
    <String as Decode<Sqlite>>::decode(value)
        .map(JsonValue::String)
        .unwrap_or(JsonValue::Null)
}

/// Non-finite reals (`1e999`) have no JSON number form.
fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}
