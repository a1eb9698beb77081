//! SpendWise core - schema-driven SQLite storage for an expense tracker
//!
//! Entities are declared once against a [`SchemaRegistry`]; the
//! [`Migrator`] keeps live tables in line with the declarations, the
//! [`EntityStore`] serves JSON-record CRUD over Mongo-style filters, and
//! [`DataSync`] backs the whole database up to remote storage and merges
//! it back.

pub mod error;
pub mod schema;
pub mod storage;
pub mod sync;
pub mod types;

pub use error::{Result, SpendwiseError};
pub use schema::{ColumnDescriptor, ColumnType, EntitySchema, Model, SchemaRegistry};
pub use storage::{EntityStore, Filter, Migrator, SqlEngine, SqliteEngine};
pub use sync::DataSync;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
