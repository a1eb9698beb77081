//! Backup, import and sync of every registered table
//!
//! `DataSync` snapshots the local tables into a [`BackupDocument`], pushes
//! it to a [`RemoteStore`] as gzip, and merges downloaded documents back.
//! Sync is last-write-wins on `updatedAt` with no conflict detection: local
//! edits made after the last backup can be overwritten.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

use super::dates::{fix_date, format_timestamp, parse_timestamp};
use super::document::BackupDocument;
use super::remote::{FileMeta, RemoteStore};
use super::settings::{SettingsStore, KEY_DATE_BACKUP, KEY_DATE_SYNC, KEY_FILE_ID};
use crate::error::{Result, SpendwiseError};
use crate::schema::EntitySchema;
use crate::schema::SchemaRegistry;
use crate::storage::{EntityStore, Filter, SqlEngine};
use crate::types::{
    OperationResult, Record, SyncConfig, CREATED_AT_COLUMN, UPDATED_AT_COLUMN,
};

/// Where a sync run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Downloading,
    Decompressing,
    FullImport,
    IncrementalImport,
    Success,
    Failed,
}

/// Outcome of an import
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Rows written per table
    pub written: BTreeMap<String, usize>,
    /// Tables that could not be cleared before a replace import
    pub clear_failures: Vec<(String, SpendwiseError)>,
}

impl ImportReport {
    pub fn total_written(&self) -> usize {
        self.written.values().sum()
    }
}

pub struct DataSync {
    engine: Arc<dyn SqlEngine>,
    registry: Arc<SchemaRegistry>,
    remote: Arc<dyn RemoteStore>,
    settings: Arc<dyn SettingsStore>,
    config: SyncConfig,
    phase: Mutex<SyncPhase>,
}

impl DataSync {
    pub fn new(
        engine: Arc<dyn SqlEngine>,
        registry: Arc<SchemaRegistry>,
        remote: Arc<dyn RemoteStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self::with_config(engine, registry, remote, settings, SyncConfig::default())
    }

    pub fn with_config(
        engine: Arc<dyn SqlEngine>,
        registry: Arc<SchemaRegistry>,
        remote: Arc<dyn RemoteStore>,
        settings: Arc<dyn SettingsStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            engine,
            registry,
            remote,
            settings,
            config,
            phase: Mutex::new(SyncPhase::Idle),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock()
    }

    fn enter(&self, phase: SyncPhase) {
        tracing::debug!(?phase, "Sync phase");
        *self.phase.lock() = phase;
    }

    fn store(&self, schema: Arc<EntitySchema>) -> EntityStore {
        EntityStore::new(self.engine.clone(), schema)
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Every registered table, in registration order
    pub fn export_all(&self) -> Result<BackupDocument> {
        let mut document = BackupDocument::new();
        for schema in self.registry.schemas() {
            let table = schema.table().to_string();
            let records = self.store(schema).find(&Filter::new())?;
            tracing::debug!(table = %table, rows = records.len(), "Exported table");
            document.insert(table, records);
        }
        Ok(document)
    }

    /// Write the export as pretty JSON; returns the number of records
    pub fn try_export_to_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let document = self.export_all()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, document.to_pretty_json()?)?;
        tracing::info!(path = %path.display(), records = document.total_records(), "Exported data");
        Ok(document.total_records())
    }

    pub fn export_to_file(&self, path: impl AsRef<Path>) -> OperationResult {
        match self.try_export_to_file(path) {
            Ok(count) => OperationResult::ok(format!("Exported {} records", count)),
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                OperationResult::failed("An error occurred when exporting data", e)
            }
        }
    }

    // ========================================================================
    // Import
    // ========================================================================

    pub fn try_import_from_file(
        &self,
        path: impl AsRef<Path>,
        replace_all: bool,
    ) -> Result<ImportReport> {
        let bytes = std::fs::read(path.as_ref())?;
        let document = BackupDocument::from_json_slice(&bytes)?;
        self.try_import_all(document, replace_all)
    }

    pub fn import_from_file(&self, path: impl AsRef<Path>, replace_all: bool) -> OperationResult {
        into_import_result(self.try_import_from_file(path, replace_all))
    }

    pub fn import_all(&self, document: BackupDocument, replace_all: bool) -> OperationResult {
        into_import_result(self.try_import_all(document, replace_all))
    }

    /// Normalize dates, optionally clear every managed table, then write.
    ///
    /// Date failures abort before anything is touched. Clearing is best
    /// effort per table. The first failing table write aborts the rest.
    pub fn try_import_all(
        &self,
        mut document: BackupDocument,
        replace_all: bool,
    ) -> Result<ImportReport> {
        let schemas = self.registry.schemas();

        for schema in &schemas {
            if let Some(records) = document.table_mut(schema.table()) {
                for record in records.iter_mut() {
                    normalize_dates(schema, record)?;
                }
            }
        }

        let mut report = ImportReport::default();
        if replace_all {
            for schema in &schemas {
                let table = schema.table().to_string();
                if let Err(e) = self.store(schema.clone()).delete_all() {
                    tracing::warn!(table = %table, error = %e, "Failed to clear table");
                    report.clear_failures.push((table, e));
                }
            }
            if let Err(e) = self.engine.execute("VACUUM") {
                tracing::warn!(error = %e, "VACUUM after clearing failed");
            }
        }

        for schema in schemas {
            let table = schema.table().to_string();
            let records = match document.take_table(&table) {
                Some(records) if !records.is_empty() => records,
                _ => continue,
            };
            let store = self.store(schema);
            let written = if replace_all {
                store.insert_many(records)?
            } else {
                store.upsert_many(records)?
            };
            tracing::debug!(table = %table, rows = written, "Imported table");
            report.written.insert(table, written);
        }

        for unknown in document.table_names() {
            tracing::debug!(table = unknown, "Skipping unmanaged table in import");
        }

        tracing::info!(
            replace_all,
            records = report.total_written(),
            "Imported data"
        );
        Ok(report)
    }

    // ========================================================================
    // Remote
    // ========================================================================

    /// Replace the remote backup with a fresh export
    pub async fn try_backup(&self, access_token: &str) -> Result<FileMeta> {
        self.remote.set_access_token(access_token);

        let scope = &self.config.folder_scope;
        for old in self.remote.list_files(scope).await? {
            tracing::debug!(file_id = %old.id, "Removing previous backup");
            self.remote.delete(&old.id).await?;
        }

        let bytes = self.export_all()?.to_gzip()?;
        let size = bytes.len();
        let meta = self
            .remote
            .upload(&self.config.file_name, &self.config.mime_type, bytes, scope)
            .await?;

        self.settings.set(KEY_FILE_ID, Value::String(meta.id.clone()))?;
        self.settings
            .set(KEY_DATE_BACKUP, Value::String(format_timestamp(&Utc::now())))?;
        tracing::info!(file_id = %meta.id, bytes = size, "Backup complete");
        Ok(meta)
    }

    pub async fn backup(&self, access_token: &str) -> OperationResult {
        match self.try_backup(access_token).await {
            Ok(_) => OperationResult::ok("Backup data successfully"),
            Err(e) => {
                tracing::error!(error = %e, "Backup failed");
                OperationResult::failed("An error occurred when backing up data", e)
            }
        }
    }

    /// Pull the remote backup and merge it into the local tables.
    ///
    /// Without a readable cursor the local tables are replaced. Otherwise
    /// only records updated after the cursor are upserted.
    pub async fn try_sync(&self, access_token: &str) -> Result<ImportReport> {
        let result = self.run_sync(access_token).await;
        match &result {
            Ok(_) => self.enter(SyncPhase::Success),
            Err(_) => self.enter(SyncPhase::Failed),
        }
        result
    }

    async fn run_sync(&self, access_token: &str) -> Result<ImportReport> {
        self.remote.set_access_token(access_token);

        self.enter(SyncPhase::Downloading);
        // Another device's backup replaces ours, so the stored id may be stale
        let file_id = self
            .remote
            .list_files(&self.config.folder_scope)
            .await?
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| SpendwiseError::RemoteIo("no backup found".to_string()))?;
        let bytes = self.remote.download(&file_id).await?;
        if self.settings.get_str(KEY_FILE_ID).as_deref() != Some(file_id.as_str()) {
            self.settings.set(KEY_FILE_ID, Value::String(file_id.clone()))?;
        }

        self.enter(SyncPhase::Decompressing);
        let document = BackupDocument::from_gzip(&bytes)?;

        let cursor = self
            .settings
            .get(KEY_DATE_SYNC)
            .as_ref()
            .and_then(parse_timestamp);
        let report = match cursor {
            None => {
                self.enter(SyncPhase::FullImport);
                tracing::info!(file_id = %file_id, "No sync cursor, replacing local data");
                self.try_import_all(document, true)?
            }
            Some(cursor) => {
                self.enter(SyncPhase::IncrementalImport);
                let newer = document.updated_after(&cursor);
                tracing::info!(
                    file_id = %file_id,
                    cursor = %format_timestamp(&cursor),
                    records = newer.total_records(),
                    "Merging records newer than cursor"
                );
                self.try_import_all(newer, false)?
            }
        };

        self.settings
            .set(KEY_DATE_SYNC, Value::String(format_timestamp(&Utc::now())))?;
        Ok(report)
    }

    pub async fn sync(&self, access_token: &str) -> OperationResult {
        match self.try_sync(access_token).await {
            Ok(_) => OperationResult::ok("Sync data successfully"),
            Err(e) => {
                tracing::error!(error = %e, "Sync failed");
                OperationResult::failed("An error occurred when sync data", e)
            }
        }
    }
}

fn into_import_result(result: Result<ImportReport>) -> OperationResult {
    match result {
        Ok(report) => OperationResult::ok(format!(
            "Import data successfully ({} records)",
            report.total_written()
        )),
        Err(e) => {
            tracing::error!(error = %e, "Import failed");
            OperationResult::failed("An error occurred when importing data", e)
        }
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn date_error(schema: &EntitySchema, record: &Record, column: &str) -> SpendwiseError {
    let id = schema
        .primary_key()
        .and_then(|pk| record.get(&pk.name))
        .map(Value::to_string)
        .unwrap_or_else(|| "?".to_string());
    SpendwiseError::DateNormalization(format!(
        "{}.{} on record {}: {}",
        schema.table(),
        column,
        id,
        record.get(column).map(Value::to_string).unwrap_or_default()
    ))
}

/// Rewrite every date column of `record` as ISO-8601 UTC.
///
/// A blank `createdAt` takes the normalized `updatedAt`. Blank `updatedAt`
/// and blank required dates are errors, as is any unparseable value.
fn normalize_dates(schema: &EntitySchema, record: &mut Record) -> Result<()> {
    let mut fixed: Vec<(String, String)> = Vec::new();
    for column in schema.date_columns() {
        let value = record.get(&column.name);
        if !is_blank(value) {
            match value.and_then(fix_date) {
                Some(date) => fixed.push((column.name.clone(), date)),
                None => return Err(date_error(schema, record, &column.name)),
            }
        } else if column.required || column.name == UPDATED_AT_COLUMN {
            return Err(date_error(schema, record, &column.name));
        }
    }

    for (name, date) in fixed {
        record.insert(name, Value::String(date));
    }

    if schema.tracks_created_at() && is_blank(record.get(CREATED_AT_COLUMN)) {
        match record.get(UPDATED_AT_COLUMN).filter(|v| !is_blank(Some(*v))) {
            Some(updated) => {
                let updated = updated.clone();
                record.insert(CREATED_AT_COLUMN.to_string(), updated);
            }
            None => return Err(date_error(schema, record, CREATED_AT_COLUMN)),
        }
    }
    Ok(())
}
