//! SQL engine abstraction
//!
//! The store, migrator and sync orchestrator only ever talk to the database
//! through [`SqlEngine`], so a different embedded engine can be swapped in
//! without touching them.
//!
//! All methods are synchronous and take `&self`; implementations serialize
//! access internally.

use serde::{Deserialize, Serialize};

use super::value::SqlValue;
use crate::error::Result;
use crate::types::Record;

/// One column of a live table, as reported by `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

/// A parameterized statement for batch execution
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A statement without parameters
    pub fn plain(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

pub trait SqlEngine: Send + Sync {
    /// Run one or more parameterless statements (DDL)
    fn execute(&self, sql: &str) -> Result<()>;

    /// Run a query and return every row as a record keyed by column name
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>>;

    /// Run a write statement and return the number of changed rows
    fn run(&self, sql: &str, params: &[SqlValue], use_transaction: bool) -> Result<usize>;

    /// Run an `INSERT` and return the rowid of the new row
    fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<i64>;

    /// Run statements in order inside a single transaction.
    ///
    /// Returns the total number of changed rows. Nothing is committed if any
    /// statement fails.
    fn transaction(&self, statements: &[Statement]) -> Result<usize>;

    /// Live columns of `table`; empty when the table does not exist
    fn introspect_columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Names of every index on `table`, including ones SQLite created itself
    fn list_indexes(&self, table: &str) -> Result<Vec<String>>;

    /// Release the underlying connection; the next call reopens it
    fn close(&self) -> Result<()>;
}
