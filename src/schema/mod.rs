//! Declarative entity schemas
//!
//! - `column`: per-field storage constraints
//! - `registry`: entity schemas keyed by type tag
//! - `ddl`: statement builders derived from a schema
//! - `models`: the built-in SpendWise entities

pub mod column;
pub mod ddl;
pub mod models;
pub mod registry;

pub use column::{ColumnDescriptor, ColumnType};
pub use models::{register_default_models, Income, Note, SpendItem, SpendList};
pub use registry::{EntitySchema, Model, SchemaBuilder, SchemaRegistry};
