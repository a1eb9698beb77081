//! Conversion between JSON record values and SQLite values

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde_json::Number;

use crate::error::{Result, SpendwiseError};
use crate::schema::ColumnType;

/// A bound parameter or a fetched cell
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Convert a JSON value without column context.
    ///
    /// Booleans become 0/1; arrays and objects are stored as JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }

    /// Convert a JSON value destined for a column of `storage_type`.
    ///
    /// BLOB columns travel through JSON as base64 text and are decoded here.
    pub fn for_column(value: &serde_json::Value, storage_type: ColumnType) -> Result<Self> {
        match (storage_type, value) {
            (ColumnType::Blob, serde_json::Value::String(encoded)) => BASE64
                .decode(encoded)
                .map(SqlValue::Blob)
                .map_err(|e| SpendwiseError::InvalidInput(format!("invalid base64 blob: {}", e))),
            _ => Ok(Self::from_json(value)),
        }
    }

    pub fn into_json(self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Integer(i) => serde_json::Value::Number(i.into()),
            SqlValue::Real(f) => Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            SqlValue::Text(s) => serde_json::Value::String(s),
            SqlValue::Blob(bytes) => serde_json::Value::String(BASE64.encode(bytes)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&serde_json::Value> for SqlValue {
    fn from(value: &serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}
