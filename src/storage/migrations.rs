//! Schema migrations: reconcile live tables with registered schemas
//!
//! Migrations are derived, not versioned. Each pass compares the declared
//! columns with `PRAGMA table_info` and emits the smallest DDL that closes the
//! gap. A pass either adds columns or removes them, never both; removals wait
//! for a later pass once nothing is missing.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use super::engine::{ColumnInfo, SqlEngine, Statement};
use crate::error::{Result, SpendwiseError};
use crate::schema::ddl::{
    build_add_column, build_create_indexes, build_create_table, build_drop_column,
    build_drop_indexes,
};
use crate::schema::{EntitySchema, SchemaRegistry};

/// What one reconcile pass did to a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub table: String,
    /// The table did not exist and was created
    pub created: bool,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Every statement executed, in order
    pub statements: Vec<String>,
}

impl MigrationReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    /// No DDL was needed
    pub fn is_noop(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Outcome of migrating every registered entity
#[derive(Debug, Default)]
pub struct MigrationSummary {
    pub reports: Vec<MigrationReport>,
    /// Entity type and the error that stopped its migration
    pub failures: Vec<(String, SpendwiseError)>,
}

impl MigrationSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compute the statements that bring a table in line with `schema`.
///
/// `introspected` is `None` (or empty) when the table does not exist. `live_indexes`
/// is only consulted when a column difference is found.
pub fn plan_migration(
    schema: &EntitySchema,
    introspected: Option<&[ColumnInfo]>,
    live_indexes: &[String],
) -> Result<MigrationReport> {
    let mut report = MigrationReport::new(schema.table());

    let live = match introspected {
        None | Some([]) => {
            report.created = true;
            report.statements.push(build_create_table(schema));
            report.statements.extend(build_create_indexes(schema));
            return Ok(report);
        }
        Some(live) => live,
    };

    let live_names: HashSet<&str> = live.iter().map(|c| c.name.as_str()).collect();
    let declared_names: HashSet<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();

    let to_add: Vec<_> = schema
        .columns()
        .iter()
        .filter(|c| !live_names.contains(c.name.as_str()))
        .collect();
    let to_remove: Vec<&str> = live
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| !declared_names.contains(name))
        .collect();

    if to_add.is_empty() && to_remove.is_empty() {
        return Ok(report);
    }

    // Render every ADD COLUMN first so an unsupported one fails before any DDL
    let add_statements = to_add
        .iter()
        .map(|c| build_add_column(schema, c))
        .collect::<Result<Vec<_>>>()?;

    // SQLite refuses to drop a column that is still indexed
    report.statements.extend(build_drop_indexes(live_indexes));

    if !add_statements.is_empty() {
        report.statements.extend(add_statements);
        report.added = to_add.iter().map(|c| c.name.clone()).collect();
    } else {
        for name in &to_remove {
            report
                .statements
                .push(build_drop_column(schema.table(), name));
        }
        report.removed = to_remove.iter().map(|s| s.to_string()).collect();
    }

    report.statements.extend(build_create_indexes(schema));
    Ok(report)
}

/// Applies schema migrations through a [`SqlEngine`]
pub struct Migrator {
    engine: Arc<dyn SqlEngine>,
}

impl Migrator {
    pub fn new(engine: Arc<dyn SqlEngine>) -> Self {
        Self { engine }
    }

    /// Reconcile one table given its introspected columns (`None` when the
    /// table is missing). All statements run in a single transaction.
    pub fn reconcile(
        &self,
        schema: &EntitySchema,
        introspected: Option<&[ColumnInfo]>,
    ) -> Result<MigrationReport> {
        let live_indexes = match introspected {
            Some(live) if !live.is_empty() => self.engine.list_indexes(schema.table())?,
            _ => Vec::new(),
        };
        let report = plan_migration(schema, introspected, &live_indexes)?;
        self.apply(&report)?;

        if report.created {
            tracing::info!(table = %report.table, "Created table");
        } else if !report.is_noop() {
            tracing::info!(
                table = %report.table,
                added = ?report.added,
                removed = ?report.removed,
                "Migrated table"
            );
        }
        Ok(report)
    }

    /// Introspect the live table and reconcile it with `schema`
    pub fn migrate(&self, schema: &EntitySchema) -> Result<MigrationReport> {
        if self.engine.table_exists(schema.table())? {
            let live = self.engine.introspect_columns(schema.table())?;
            self.reconcile(schema, Some(&live))
        } else {
            self.reconcile(schema, None)
        }
    }

    /// Create the table and its indexes if missing, without diffing columns
    pub fn ensure_table(&self, schema: &EntitySchema) -> Result<MigrationReport> {
        let mut report = MigrationReport::new(schema.table());
        report.created = !self.engine.table_exists(schema.table())?;
        report.statements.push(build_create_table(schema));
        report.statements.extend(build_create_indexes(schema));
        self.apply(&report)?;
        Ok(report)
    }

    /// Migrate every registered schema in registration order.
    ///
    /// With `check_update` unset only missing tables and indexes are created.
    /// A failing entity is logged and recorded; the rest still migrate.
    pub fn migrate_all(&self, registry: &SchemaRegistry, check_update: bool) -> MigrationSummary {
        let mut summary = MigrationSummary::default();
        for schema in registry.schemas() {
            let result = if check_update {
                self.migrate(&schema)
            } else {
                self.ensure_table(&schema)
            };
            match result {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    tracing::error!(
                        entity = schema.entity_type(),
                        error = %e,
                        "Schema migration failed"
                    );
                    summary
                        .failures
                        .push((schema.entity_type().to_string(), e));
                }
            }
        }
        summary
    }

    fn apply(&self, report: &MigrationReport) -> Result<()> {
        if report.is_noop() {
            return Ok(());
        }
        let statements: Vec<Statement> = report
            .statements
            .iter()
            .map(|sql| Statement::plain(sql.as_str()))
            .collect();
        self.engine.transaction(&statements)?;
        Ok(())
    }
}
