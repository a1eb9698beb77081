//! Storage layer for SpendWise
//!
//! Handles the SQLite engine, filter compilation, schema migrations and
//! generic entity CRUD.

mod connection;
mod engine;
pub mod filter;
mod migrations;
mod store;
mod value;

pub use connection::SqliteEngine;
pub use engine::{ColumnInfo, SqlEngine, Statement};
pub use filter::{parse_filter, Condition, Filter, Predicate};
pub use migrations::{plan_migration, MigrationReport, MigrationSummary, Migrator};
pub use store::{EntityStore, FindOptions, SortOrder};
pub use value::SqlValue;
