//! Backup document: every managed table dumped as an array of records
//!
//! Wire format is a JSON object keyed by table name:
//!
//! ```json
//! { "SpendList": [{...}], "SpendItem": [...], "Note": [...], "Income": [...] }
//! ```
//!
//! Remote copies are gzip-compressed pretty JSON. Documents written by the
//! first app version (`spendingList`, `spendingItem`, `noted`, `income`) are
//! translated on load.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::{json, Value};

use super::dates::parse_timestamp;
use crate::error::{Result, SpendwiseError};
use crate::schema::models::{STATUS_ACTIVE, STATUS_INACTIVE};
use crate::types::{Record, UPDATED_AT_COLUMN};

/// Records per table name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BackupDocument {
    tables: BTreeMap<String, Vec<Record>>,
}

impl BackupDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, records: Vec<Record>) {
        self.tables.insert(table.into(), records);
    }

    pub fn table(&self, name: &str) -> Option<&[Record]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Vec<Record>> {
        self.tables.get_mut(name)
    }

    pub fn take_table(&mut self, name: &str) -> Option<Vec<Record>> {
        self.tables.remove(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn total_records(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Read a document from JSON, translating the legacy layout if needed.
    ///
    /// Keys whose value is not an array (such as a `Version` number) are
    /// ignored.
    pub fn from_value(value: Value) -> Result<Self> {
        let obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(SpendwiseError::InvalidInput(format!(
                    "Backup document must be a JSON object, got {}",
                    type_name(&other)
                )))
            }
        };

        if is_legacy(&obj) {
            tracing::info!("Translating legacy backup document");
            return Ok(translate_legacy(&obj));
        }

        let mut document = Self::new();
        for (table, value) in obj {
            let Value::Array(items) = value else {
                continue;
            };
            let records = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(SpendwiseError::InvalidInput(format!(
                        "Table '{}' contains a non-object record: {}",
                        table, other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            document.insert(table, records);
        }
        Ok(document)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Gzip-compressed pretty JSON, as uploaded
    pub fn to_gzip(&self) -> Result<Vec<u8>> {
        let json = self.to_pretty_json()?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes())?;
        Ok(encoder.finish()?)
    }

    pub fn from_gzip(bytes: &[u8]) -> Result<Self> {
        let mut decoder = GzDecoder::new(bytes);
        let mut json = Vec::new();
        decoder.read_to_end(&mut json)?;
        Self::from_json_slice(&json)
    }

    /// Keep only records whose `updatedAt` parses and is strictly after
    /// `cursor`.
    pub fn updated_after(&self, cursor: &DateTime<Utc>) -> Self {
        let tables = self
            .tables
            .iter()
            .map(|(name, records)| {
                let newer = records
                    .iter()
                    .filter(|record| {
                        record
                            .get(UPDATED_AT_COLUMN)
                            .and_then(parse_timestamp)
                            .is_some_and(|updated| updated > *cursor)
                    })
                    .cloned()
                    .collect();
                (name.clone(), newer)
            })
            .collect();
        Self { tables }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_legacy(obj: &serde_json::Map<String, Value>) -> bool {
    obj.contains_key("spendingList")
}

/// Numeric status 1 was active; anything else inactive
fn legacy_status(value: Option<&Value>) -> Value {
    let active = match value {
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => s.trim() == "1",
        Some(Value::Bool(b)) => *b,
        _ => false,
    };
    json!(if active { STATUS_ACTIVE } else { STATUS_INACTIVE })
}

/// Legacy ids were integers; keys are text now
fn legacy_id(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Number(n)) => Value::String(n.to_string()),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

fn field(item: &Record, key: &str) -> Value {
    item.get(key).cloned().unwrap_or(Value::Null)
}

fn legacy_rows<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Record> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn into_record(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}

fn translate_legacy(obj: &serde_json::Map<String, Value>) -> BackupDocument {
    let spend_lists = legacy_rows(obj, "spendingList")
        .map(|item| {
            into_record(json!({
                "_id": legacy_id(item.get("id")),
                "name": field(item, "namelist"),
                "status": legacy_status(item.get("status")),
                "createdAt": field(item, "atcreate"),
                "updatedAt": field(item, "atupdate"),
                "_v": 0,
            }))
        })
        .collect();

    let spend_items = legacy_rows(obj, "spendingItem")
        .map(|item| {
            into_record(json!({
                "_id": legacy_id(item.get("id")),
                "listId": legacy_id(item.get("spendlistid")),
                "name": field(item, "nameitem"),
                "price": field(item, "price"),
                "details": field(item, "details"),
                "date": field(item, "atupdate"),
                "createdAt": field(item, "atcreate"),
                "updatedAt": field(item, "atupdate"),
                "status": legacy_status(item.get("status")),
                "_v": 0,
            }))
        })
        .collect();

    let notes = legacy_rows(obj, "noted")
        .map(|item| {
            into_record(json!({
                "_id": legacy_id(item.get("id")),
                "name": field(item, "namelist"),
                "content": field(item, "content"),
                "createdAt": field(item, "atcreate"),
                "updatedAt": field(item, "atupdate"),
                "status": legacy_status(item.get("status")),
                "_v": 0,
            }))
        })
        .collect();

    let incomes = legacy_rows(obj, "income")
        .map(|item| {
            into_record(json!({
                "_id": legacy_id(item.get("id")),
                "listId": legacy_id(item.get("spendlistid")),
                "name": "",
                "price": field(item, "price"),
                "status": legacy_status(item.get("status")),
                "date": field(item, "atupdate"),
                "createdAt": field(item, "atcreate"),
                "updatedAt": field(item, "atupdate"),
                "_v": 0,
            }))
        })
        .collect();

    let mut document = BackupDocument::new();
    document.insert("SpendList", spend_lists);
    document.insert("SpendItem", spend_items);
    document.insert("Note", notes);
    document.insert("Income", incomes);
    document
}
