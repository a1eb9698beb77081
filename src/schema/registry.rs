//! Entity schemas and the registry that holds them
//!
//! A schema is declared once at process start, either with
//! [`SchemaRegistry::declare`] or through a [`Model`] implementation, and is
//! immutable afterwards. Declaring the same entity type again replaces the
//! previous schema wholesale.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::column::{is_identifier, ColumnDescriptor};
use crate::error::{Result, SpendwiseError};
use crate::types::{CREATED_AT_COLUMN, UPDATED_AT_COLUMN, VERSION_COLUMN};

/// Declared columns and table name of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    entity_type: String,
    table: String,
    columns: Vec<ColumnDescriptor>,
}

impl EntitySchema {
    /// Start a schema for `entity_type`, stored in `table`
    pub fn builder(entity_type: impl Into<String>, table: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            entity_type: entity_type.into(),
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Validate and assemble a schema
    pub fn new(
        entity_type: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> Result<Self> {
        let schema = Self {
            entity_type: entity_type.into(),
            table: table.into(),
            columns,
        };
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<()> {
        if self.entity_type.is_empty() {
            return Err(SpendwiseError::InvalidSchema(
                "entity type cannot be empty".to_string(),
            ));
        }
        if !is_identifier(&self.table) {
            return Err(SpendwiseError::InvalidSchema(format!(
                "table name '{}' is not a valid identifier",
                self.table
            )));
        }
        if self.columns.is_empty() {
            return Err(SpendwiseError::InvalidSchema(format!(
                "{} declares no columns",
                self.entity_type
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !is_identifier(&column.name) {
                return Err(SpendwiseError::InvalidSchema(format!(
                    "column name '{}' in {} is not a valid identifier",
                    column.name, self.entity_type
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(SpendwiseError::InvalidSchema(format!(
                    "column '{}' declared twice in {}",
                    column.name, self.entity_type
                )));
            }
            if let (Some(default), Some(allowed)) = (&column.default, &column.enum_values) {
                if !allowed.contains(default) {
                    return Err(SpendwiseError::InvalidSchema(format!(
                        "default '{}' of {}.{} is not one of {:?}",
                        default, self.entity_type, column.name, allowed
                    )));
                }
            }
        }

        let keys: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        if keys.len() > 1 {
            return Err(SpendwiseError::InvalidSchema(format!(
                "{} declares more than one primary key: {}",
                self.entity_type,
                keys.join(", ")
            )));
        }

        Ok(())
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in registration order
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.primary_key)
    }

    pub fn tracks_version(&self) -> bool {
        self.has_column(VERSION_COLUMN)
    }

    pub fn tracks_created_at(&self) -> bool {
        self.has_column(CREATED_AT_COLUMN)
    }

    pub fn tracks_updated_at(&self) -> bool {
        self.has_column(UPDATED_AT_COLUMN)
    }

    pub fn date_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.date_like)
    }
}

/// Fluent construction of an [`EntitySchema`]
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    entity_type: String,
    table: String,
    columns: Vec<ColumnDescriptor>,
}

impl SchemaBuilder {
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> Result<EntitySchema> {
        EntitySchema::new(self.entity_type, self.table, self.columns)
    }
}

/// A type whose storage layout is declared up front
pub trait Model {
    /// Entity type tag the schema is registered under
    const ENTITY: &'static str;

    fn schema() -> Result<EntitySchema>;
}

/// Registered schemas keyed by entity type, in registration order
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    order: Vec<String>,
    schemas: HashMap<String, Arc<EntitySchema>>,
}

static GLOBAL_REGISTRY: Lazy<Arc<SchemaRegistry>> = Lazy::new(|| Arc::new(SchemaRegistry::new()));

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<SchemaRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Declare an entity from its table name and fields
    pub fn declare(
        &self,
        entity_type: &str,
        table: &str,
        fields: Vec<ColumnDescriptor>,
    ) -> Result<Arc<EntitySchema>> {
        self.insert(EntitySchema::new(entity_type, table, fields)?)
    }

    /// Register a prebuilt schema under its own entity type
    pub fn insert(&self, schema: EntitySchema) -> Result<Arc<EntitySchema>> {
        schema.validate()?;
        let schema = Arc::new(schema);
        let mut inner = self.inner.write();
        let key = schema.entity_type().to_string();
        if inner.schemas.insert(key.clone(), Arc::clone(&schema)).is_none() {
            inner.order.push(key);
        }
        tracing::debug!(
            entity = schema.entity_type(),
            table = schema.table(),
            columns = schema.columns().len(),
            "Registered entity schema"
        );
        Ok(schema)
    }

    /// Register the schema of a [`Model`]
    pub fn register<M: Model>(&self) -> Result<Arc<EntitySchema>> {
        self.insert(M::schema()?)
    }

    pub fn schema_of(&self, entity_type: &str) -> Result<Arc<EntitySchema>> {
        self.inner
            .read()
            .schemas
            .get(entity_type)
            .cloned()
            .ok_or_else(|| SpendwiseError::SchemaNotFound(entity_type.to_string()))
    }

    pub fn schema_of_model<M: Model>(&self) -> Result<Arc<EntitySchema>> {
        self.schema_of(M::ENTITY)
    }

    /// Look a schema up by its storage table
    pub fn by_table(&self, table: &str) -> Option<Arc<EntitySchema>> {
        let inner = self.inner.read();
        inner.schemas.values().find(|s| s.table() == table).cloned()
    }

    /// All schemas in registration order
    pub fn schemas(&self) -> Vec<Arc<EntitySchema>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|key| inner.schemas.get(key).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
