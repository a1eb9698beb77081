//! DDL statement builders
//!
//! Every function here is pure: it renders statement text from a schema and
//! never touches a connection. Identifiers are validated when the schema is
//! registered, so they are spliced in unquoted.

use super::column::{quote_literal, ColumnDescriptor};
use super::registry::EntitySchema;
use crate::error::{Result, SpendwiseError};

/// Prefix SQLite uses for indexes backing `UNIQUE`/`PRIMARY KEY` constraints
const AUTO_INDEX_PREFIX: &str = "sqlite_autoindex";

/// Render one column definition.
///
/// Layout: `name TYPE [CHECK(name IN ('a', 'b'))] [NOT NULL] [PRIMARY KEY] [DEFAULT 'v']`
pub fn column_definition(column: &ColumnDescriptor) -> String {
    render_column(column, true)
}

fn render_column(column: &ColumnDescriptor, with_primary_key: bool) -> String {
    let mut def = format!("{} {}", column.name, column.storage_type.as_sql());

    if let Some(values) = column.enum_values.as_ref().filter(|v| !v.is_empty()) {
        let allowed: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
        def.push_str(&format!(" CHECK({} IN ({}))", column.name, allowed.join(", ")));
    }
    if column.required {
        def.push_str(" NOT NULL");
    }
    if with_primary_key && column.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if let Some(default) = &column.default {
        def.push_str(&format!(" DEFAULT {}", quote_literal(default)));
    }

    def
}

pub fn build_create_table(schema: &EntitySchema) -> String {
    let columns: Vec<String> = schema.columns().iter().map(column_definition).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        schema.table(),
        columns.join(", ")
    )
}

/// Name of the index created for `column` of `table`
pub fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}", table, column)
}

/// One statement per indexed or unique column, in registration order
pub fn build_create_indexes(schema: &EntitySchema) -> Vec<String> {
    schema
        .columns()
        .iter()
        .filter(|c| (c.indexed || c.unique) && !c.primary_key)
        .map(|c| {
            let kind = if c.unique { "UNIQUE INDEX" } else { "INDEX" };
            format!(
                "CREATE {} IF NOT EXISTS {} ON {}({})",
                kind,
                index_name(schema.table(), &c.name),
                schema.table(),
                c.name
            )
        })
        .collect()
}

/// Drop statements for live indexes, skipping the ones SQLite owns
pub fn build_drop_indexes<S: AsRef<str>>(index_names: &[S]) -> Vec<String> {
    index_names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.starts_with(AUTO_INDEX_PREFIX))
        .map(|name| format!("DROP INDEX IF EXISTS {}", name))
        .collect()
}

/// `ALTER TABLE ... ADD COLUMN` for a column missing from the live table.
///
/// SQLite cannot add a primary key to an existing table, so a key column
/// yields [`SpendwiseError::UnsupportedMigration`].
pub fn build_add_column(schema: &EntitySchema, column: &ColumnDescriptor) -> Result<String> {
    if column.primary_key {
        return Err(SpendwiseError::UnsupportedMigration(format!(
            "cannot add primary key column {}.{} to an existing table",
            schema.table(),
            column.name
        )));
    }
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        schema.table(),
        render_column(column, false)
    ))
}

pub fn build_drop_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", table, column)
}
