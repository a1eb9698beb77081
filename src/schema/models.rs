//! Built-in SpendWise entities

use super::column::ColumnDescriptor;
use super::registry::{EntitySchema, Model, SchemaBuilder, SchemaRegistry};
use crate::error::Result;
use crate::types::{CREATED_AT_COLUMN, UPDATED_AT_COLUMN, VERSION_COLUMN};

pub const STATUS_ACTIVE: &str = "Active";
pub const STATUS_INACTIVE: &str = "Inactive";

fn id_column() -> ColumnDescriptor {
    ColumnDescriptor::text("_id").required().primary_key()
}

fn status_column() -> ColumnDescriptor {
    ColumnDescriptor::text("status")
        .one_of([STATUS_ACTIVE, STATUS_INACTIVE])
        .default_value(STATUS_ACTIVE)
}

/// `createdAt`, `updatedAt`, `_v`
fn bookkeeping_columns() -> [ColumnDescriptor; 3] {
    [
        ColumnDescriptor::timestamp(CREATED_AT_COLUMN),
        ColumnDescriptor::timestamp(UPDATED_AT_COLUMN),
        ColumnDescriptor::integer(VERSION_COLUMN)
            .required()
            .default_value(0),
    ]
}

fn with_bookkeeping(builder: SchemaBuilder) -> Result<EntitySchema> {
    bookkeeping_columns()
        .into_iter()
        .fold(builder, |b, c| b.column(c))
        .build()
}

/// A named spending list
pub struct SpendList;

impl Model for SpendList {
    const ENTITY: &'static str = "SpendList";

    fn schema() -> Result<EntitySchema> {
        with_bookkeeping(
            EntitySchema::builder(Self::ENTITY, "SpendList")
                .column(id_column())
                .column(ColumnDescriptor::text("name").required().indexed())
                .column(status_column()),
        )
    }
}

/// One expense inside a [`SpendList`]
pub struct SpendItem;

impl Model for SpendItem {
    const ENTITY: &'static str = "SpendItem";

    fn schema() -> Result<EntitySchema> {
        with_bookkeeping(
            EntitySchema::builder(Self::ENTITY, "SpendItem")
                .column(id_column())
                .column(ColumnDescriptor::text("listId").required())
                .column(ColumnDescriptor::text("name").required().indexed())
                .column(ColumnDescriptor::real("price"))
                .column(ColumnDescriptor::text("details"))
                .column(status_column())
                .column(ColumnDescriptor::timestamp("date").required().indexed()),
        )
    }
}

pub struct Note;

impl Model for Note {
    const ENTITY: &'static str = "Note";

    fn schema() -> Result<EntitySchema> {
        with_bookkeeping(
            EntitySchema::builder(Self::ENTITY, "Note")
                .column(id_column())
                .column(ColumnDescriptor::text("name").required().indexed())
                .column(ColumnDescriptor::text("content"))
                .column(status_column()),
        )
    }
}

/// Money received into a [`SpendList`]
pub struct Income;

impl Model for Income {
    const ENTITY: &'static str = "Income";

    fn schema() -> Result<EntitySchema> {
        with_bookkeeping(
            EntitySchema::builder(Self::ENTITY, "Income")
                .column(id_column())
                .column(ColumnDescriptor::text("listId").required())
                .column(ColumnDescriptor::text("name"))
                .column(ColumnDescriptor::real("price"))
                .column(status_column())
                .column(ColumnDescriptor::timestamp("date").required().indexed()),
        )
    }
}

/// Register the four built-in entities, in backup order
pub fn register_default_models(registry: &SchemaRegistry) -> Result<()> {
    registry.register::<SpendList>()?;
    registry.register::<SpendItem>()?;
    registry.register::<Note>()?;
    registry.register::<Income>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ddl::build_create_table;

    #[test]
    fn test_default_models_register() {
        let registry = SchemaRegistry::new();
        register_default_models(&registry).unwrap();

        let tables: Vec<String> = registry
            .schemas()
            .iter()
            .map(|s| s.table().to_string())
            .collect();
        assert_eq!(tables, ["SpendList", "SpendItem", "Note", "Income"]);
    }

    #[test]
    fn test_every_model_is_versioned_and_keyed() {
        for schema in [
            SpendList::schema().unwrap(),
            SpendItem::schema().unwrap(),
            Note::schema().unwrap(),
            Income::schema().unwrap(),
        ] {
            assert_eq!(schema.primary_key().map(|c| c.name.as_str()), Some("_id"));
            assert!(schema.tracks_version());
            assert!(schema.tracks_created_at());
            assert!(schema.tracks_updated_at());
        }
    }

    #[test]
    fn test_spend_list_ddl() {
        let sql = build_create_table(&SpendList::schema().unwrap());
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS SpendList (_id TEXT NOT NULL PRIMARY KEY, \
             name TEXT NOT NULL, status TEXT CHECK(status IN ('Active', 'Inactive')) \
             DEFAULT 'Active', createdAt TEXT, updatedAt TEXT, _v INTEGER NOT NULL DEFAULT '0')"
        );
    }

    #[test]
    fn test_item_date_columns() {
        let schema = SpendItem::schema().unwrap();
        let dates: Vec<&str> = schema.date_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(dates, ["date", "createdAt", "updatedAt"]);
    }
}
