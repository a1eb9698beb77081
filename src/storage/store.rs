//! Generic CRUD over one registered entity
//!
//! Records are JSON objects. Only declared columns are ever written; unknown
//! keys are ignored. Bookkeeping columns are maintained when the schema
//! declares them:
//!
//! - a missing TEXT primary key is filled with a fresh UUID; INTEGER keys
//!   are assigned by SQLite
//! - `_v` starts at 0 and is incremented in SQL on every update
//! - `createdAt`/`updatedAt` are stamped on insert, `updatedAt` on update

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::engine::{SqlEngine, Statement};
use super::filter::{Condition, Filter};
use super::value::SqlValue;
use crate::error::{Result, SpendwiseError};
use crate::schema::{ColumnDescriptor, ColumnType, EntitySchema, SchemaRegistry};
use crate::types::{now_timestamp, Record, CREATED_AT_COLUMN, UPDATED_AT_COLUMN, VERSION_COLUMN};

/// Upper bound on bound parameters per statement
const MAX_PARAMS_PER_STATEMENT: usize = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Ordering and paging for [`EntityStore::find_with`]
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FindOptions {
    pub fn sort_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Clone, Copy)]
enum InsertMode {
    Insert,
    Replace,
}

impl InsertMode {
    fn verb(&self) -> &'static str {
        match self {
            InsertMode::Insert => "INSERT",
            InsertMode::Replace => "INSERT OR REPLACE",
        }
    }
}

/// CRUD operations for a single entity schema
#[derive(Clone)]
pub struct EntityStore {
    engine: Arc<dyn SqlEngine>,
    schema: Arc<EntitySchema>,
}

impl EntityStore {
    pub fn new(engine: Arc<dyn SqlEngine>, schema: Arc<EntitySchema>) -> Self {
        Self { engine, schema }
    }

    /// Store for a registered entity type
    pub fn for_entity(
        engine: Arc<dyn SqlEngine>,
        registry: &SchemaRegistry,
        entity_type: &str,
    ) -> Result<Self> {
        Ok(Self::new(engine, registry.schema_of(entity_type)?))
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    fn table(&self) -> &str {
        self.schema.table()
    }

    fn primary_key(&self) -> Result<&ColumnDescriptor> {
        self.schema.primary_key().ok_or_else(|| {
            SpendwiseError::InvalidSchema(format!(
                "{} has no primary key column",
                self.schema.entity_type()
            ))
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn find(&self, filter: &Filter) -> Result<Vec<Record>> {
        let condition = filter.compile()?;
        let sql = format!("SELECT * FROM {} {}", self.table(), condition.where_clause());
        self.engine.query(sql.trim_end(), &condition.params)
    }

    pub fn find_one(&self, filter: &Filter) -> Result<Option<Record>> {
        let condition = filter.compile()?;
        let sql = format!(
            "SELECT * FROM {} {} LIMIT 1",
            self.table(),
            condition.where_clause()
        );
        Ok(self
            .engine
            .query(&sql, &condition.params)?
            .into_iter()
            .next())
    }

    pub fn find_with(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Record>> {
        let condition = filter.compile()?;
        let mut sql = format!("SELECT * FROM {}", self.table());
        if !condition.is_empty() {
            sql.push(' ');
            sql.push_str(&condition.where_clause());
        }

        if !options.sort.is_empty() {
            let mut terms = Vec::with_capacity(options.sort.len());
            for (column, order) in &options.sort {
                if !self.schema.has_column(column) {
                    return Err(SpendwiseError::InvalidInput(format!(
                        "Cannot sort {} by undeclared column '{}'",
                        self.schema.entity_type(),
                        column
                    )));
                }
                terms.push(format!("{} {}", column, order.as_sql()));
            }
            sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
        }

        match (options.limit, options.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        self.engine.query(&sql, &condition.params)
    }

    pub fn count(&self, filter: &Filter) -> Result<i64> {
        let condition = filter.compile()?;
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {} {}",
            self.table(),
            condition.where_clause()
        );
        let rows = self.engine.query(sql.trim_end(), &condition.params)?;
        Ok(rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<Record>> {
        if id.is_empty() {
            return Err(SpendwiseError::MissingArgument("id"));
        }
        self.find_by_key(&Value::String(id.to_string()))
    }

    fn find_by_key(&self, key: &Value) -> Result<Option<Record>> {
        let pk = self.primary_key()?;
        let sql = format!("SELECT * FROM {} WHERE {} = ?", self.table(), pk.name);
        Ok(self
            .engine
            .query(&sql, &[SqlValue::for_column(key, pk.storage_type)?])?
            .into_iter()
            .next())
    }

    /// The stored `CREATE TABLE` statement, if the table exists
    pub fn table_sql(&self) -> Result<Option<String>> {
        let rows = self.engine.query(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND tbl_name = ?",
            &[SqlValue::Text(self.table().to_string())],
        )?;
        Ok(rows
            .first()
            .and_then(|row| row.get("sql"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    // ========================================================================
    // Inserts
    // ========================================================================

    fn apply_insert_defaults(&self, record: &mut Record, now: &str) {
        if let Some(pk) = self.schema.primary_key() {
            let missing = match record.get(&pk.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if missing {
                match pk.storage_type {
                    // SQLite assigns the rowid
                    ColumnType::Integer => {
                        record.remove(&pk.name);
                    }
                    _ => {
                        record.insert(
                            pk.name.clone(),
                            Value::String(Uuid::new_v4().simple().to_string()),
                        );
                    }
                }
            }
        }
        if self.schema.tracks_version() && !record.contains_key(VERSION_COLUMN) {
            record.insert(VERSION_COLUMN.to_string(), Value::from(0));
        }
        for column in [CREATED_AT_COLUMN, UPDATED_AT_COLUMN] {
            if self.schema.has_column(column) && !record.contains_key(column) {
                record.insert(column.to_string(), Value::String(now.to_string()));
            }
        }
    }

    /// Insert one record and return it as stored.
    ///
    /// When the schema has a primary key the row is read back, so column
    /// defaults applied by the database are visible in the result.
    pub fn insert_one(&self, mut record: Record) -> Result<Record> {
        if record.is_empty() {
            return Err(SpendwiseError::MissingArgument("record"));
        }
        self.apply_insert_defaults(&mut record, &now_timestamp());

        let columns: Vec<&ColumnDescriptor> = self
            .schema
            .columns()
            .iter()
            .filter(|c| record.contains_key(&c.name))
            .collect();
        if columns.is_empty() {
            return Err(SpendwiseError::MissingArgument("declared column"));
        }

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let params = columns
            .iter()
            .map(|c| SqlValue::for_column(&record[&c.name], c.storage_type))
            .collect::<Result<Vec<_>>>()?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(),
            names.join(", "),
            placeholders
        );
        let rowid = self.engine.insert(&sql, &params)?;

        match self.schema.primary_key() {
            Some(pk) => {
                let key = record
                    .get(&pk.name)
                    .cloned()
                    .unwrap_or_else(|| Value::from(rowid));
                Ok(self.find_by_key(&key)?.unwrap_or(record))
            }
            None => Ok(record),
        }
    }

    /// Insert many records in one transaction; returns the rows inserted.
    ///
    /// Every row binds the union of the columns present across the batch, so
    /// a record lacking a column that another record sets gets `NULL` there,
    /// not the column `DEFAULT`. Pass uniform records to keep defaults.
    pub fn insert_many(&self, records: Vec<Record>) -> Result<usize> {
        self.write_many(records, InsertMode::Insert)
    }

    /// Insert or replace by primary key; returns the rows written.
    ///
    /// Missing columns bind `NULL` as in [`EntityStore::insert_many`].
    pub fn upsert_many(&self, records: Vec<Record>) -> Result<usize> {
        self.write_many(records, InsertMode::Replace)
    }

    fn write_many(&self, mut records: Vec<Record>, mode: InsertMode) -> Result<usize> {
        if records.is_empty() {
            return Err(SpendwiseError::MissingArgument("records"));
        }

        let now = now_timestamp();
        for record in &mut records {
            self.apply_insert_defaults(record, &now);
        }

        // Union of present declared columns, in schema order
        let columns: Vec<&ColumnDescriptor> = self
            .schema
            .columns()
            .iter()
            .filter(|c| records.iter().any(|r| r.contains_key(&c.name)))
            .collect();
        if columns.is_empty() {
            return Err(SpendwiseError::MissingArgument("declared column"));
        }

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));
        let rows_per_statement = (MAX_PARAMS_PER_STATEMENT / columns.len()).max(1);

        let mut statements = Vec::new();
        for chunk in records.chunks(rows_per_statement) {
            let mut params = Vec::with_capacity(chunk.len() * columns.len());
            for record in chunk {
                for column in &columns {
                    let value = match record.get(&column.name) {
                        Some(value) => SqlValue::for_column(value, column.storage_type)?,
                        None => SqlValue::Null,
                    };
                    params.push(value);
                }
            }
            let sql = format!(
                "{} INTO {} ({}) VALUES {}",
                mode.verb(),
                self.table(),
                names.join(", "),
                vec![row_placeholder.as_str(); chunk.len()].join(", ")
            );
            statements.push(Statement::new(sql, params));
        }

        tracing::debug!(
            table = self.table(),
            rows = records.len(),
            statements = statements.len(),
            "Bulk write"
        );
        self.engine.transaction(&statements)?;
        // INSERT OR REPLACE counts the implicit delete too, so report rows
        Ok(records.len())
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// SET clause and its params for a patch
    fn build_set(&self, patch: &Record) -> Result<(String, Vec<SqlValue>)> {
        if patch.is_empty() {
            return Err(SpendwiseError::MissingArgument("patch"));
        }

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for column in self.schema.columns() {
            if column.name == VERSION_COLUMN || column.name == UPDATED_AT_COLUMN {
                continue;
            }
            if let Some(value) = patch.get(&column.name) {
                assignments.push(format!("{} = ?", column.name));
                params.push(SqlValue::for_column(value, column.storage_type)?);
            }
        }
        if assignments.is_empty() {
            return Err(SpendwiseError::MissingArgument("patch"));
        }

        if self.schema.tracks_updated_at() {
            assignments.push(format!("{} = ?", UPDATED_AT_COLUMN));
            params.push(SqlValue::Text(now_timestamp()));
        }
        if self.schema.tracks_version() {
            assignments.push(format!("{0} = COALESCE({0}, 0) + 1", VERSION_COLUMN));
        }

        Ok((assignments.join(", "), params))
    }

    fn required_condition(&self, filter: &Filter) -> Result<Condition> {
        if filter.is_empty() {
            return Err(SpendwiseError::MissingArgument("filter"));
        }
        filter.compile()
    }

    /// Update at most one matching row
    pub fn update_one(&self, filter: &Filter, patch: &Record) -> Result<usize> {
        let condition = self.required_condition(filter)?;
        let (set, mut params) = self.build_set(patch)?;
        let sql = format!(
            "UPDATE {0} SET {1} WHERE rowid IN (SELECT rowid FROM {0} {2} LIMIT 1)",
            self.table(),
            set,
            condition.where_clause()
        );
        params.extend(condition.params);
        self.engine.run(&sql, &params, false)
    }

    pub fn update_by_id(&self, id: &str, patch: &Record) -> Result<usize> {
        if id.is_empty() {
            return Err(SpendwiseError::MissingArgument("id"));
        }
        let pk = self.primary_key()?;
        let (set, mut params) = self.build_set(patch)?;
        let sql = format!("UPDATE {} SET {} WHERE {} = ?", self.table(), set, pk.name);
        params.push(SqlValue::Text(id.to_string()));
        self.engine.run(&sql, &params, false)
    }

    pub fn update_many(&self, filter: &Filter, patch: &Record) -> Result<usize> {
        let condition = self.required_condition(filter)?;
        let (set, mut params) = self.build_set(patch)?;
        let sql = format!(
            "UPDATE {} SET {} {}",
            self.table(),
            set,
            condition.where_clause()
        );
        params.extend(condition.params);
        self.engine.run(&sql, &params, false)
    }

    // ========================================================================
    // Deletes
    // ========================================================================

    /// Delete at most one matching row
    pub fn delete_one(&self, filter: &Filter) -> Result<usize> {
        let condition = self.required_condition(filter)?;
        let sql = format!(
            "DELETE FROM {0} WHERE rowid IN (SELECT rowid FROM {0} {1} LIMIT 1)",
            self.table(),
            condition.where_clause()
        );
        self.engine.run(&sql, &condition.params, false)
    }

    pub fn delete_by_id(&self, id: &str) -> Result<usize> {
        if id.is_empty() {
            return Err(SpendwiseError::MissingArgument("id"));
        }
        let pk = self.primary_key()?;
        let sql = format!(
            "DELETE FROM {0} WHERE rowid IN (SELECT rowid FROM {0} WHERE {1} = ? LIMIT 1)",
            self.table(),
            pk.name
        );
        self.engine
            .run(&sql, &[SqlValue::Text(id.to_string())], false)
    }

    pub fn delete_many(&self, filter: &Filter) -> Result<usize> {
        let condition = self.required_condition(filter)?;
        let sql = format!("DELETE FROM {} {}", self.table(), condition.where_clause());
        self.engine.run(&sql, &condition.params, false)
    }

    /// Remove every row
    pub fn delete_all(&self) -> Result<usize> {
        let sql = format!("DELETE FROM {}", self.table());
        self.engine.run(&sql, &[], false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::connection::SqliteEngine;
    use crate::storage::migrations::Migrator;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn item_store() -> EntityStore {
        let schema = EntitySchema::builder("Item", "Item")
            .column(ColumnDescriptor::text("id").primary_key())
            .column(ColumnDescriptor::text("name").required())
            .column(ColumnDescriptor::real("price"))
            .column(
                ColumnDescriptor::text("status")
                    .one_of(["Active", "Inactive"])
                    .default_value("Active"),
            )
            .column(ColumnDescriptor::timestamp("createdAt"))
            .column(ColumnDescriptor::timestamp("updatedAt"))
            .column(ColumnDescriptor::integer("_v").required().default_value(0))
            .build()
            .unwrap();
        let engine: Arc<dyn SqlEngine> = Arc::new(SqliteEngine::open_in_memory().unwrap());
        Migrator::new(Arc::clone(&engine)).migrate(&schema).unwrap();
        EntityStore::new(engine, Arc::new(schema))
    }

    fn seed(store: &EntityStore) {
        for (name, price) in [("Tea", 5000), ("Lunch", 15000), ("Coffee", 25000)] {
            store
                .insert_one(record(json!({"name": name, "price": price})))
                .unwrap();
        }
    }

    #[test]
    fn test_insert_one_applies_defaults() {
        let store = item_store();
        let stored = store
            .insert_one(record(json!({"name": "Coffee", "price": 25000})))
            .unwrap();

        assert_eq!(stored["status"], json!("Active"));
        assert_eq!(stored["_v"], json!(0));
        assert_eq!(stored["price"], json!(25000.0));
        let id = stored["id"].as_str().unwrap();
        assert_eq!(id.len(), 32);
        assert_eq!(stored["createdAt"], stored["updatedAt"]);
    }

    #[test]
    fn test_integer_key_assigned_by_sqlite() {
        let schema = EntitySchema::builder("Category", "Category")
            .column(ColumnDescriptor::integer("id").primary_key())
            .column(ColumnDescriptor::text("name").required())
            .build()
            .unwrap();
        let engine: Arc<dyn SqlEngine> = Arc::new(SqliteEngine::open_in_memory().unwrap());
        Migrator::new(Arc::clone(&engine)).migrate(&schema).unwrap();
        let store = EntityStore::new(engine, Arc::new(schema));

        let food = store.insert_one(record(json!({"name": "Food"}))).unwrap();
        assert_eq!(food["id"], json!(1));
        let rent = store
            .insert_one(record(json!({"id": null, "name": "Rent"})))
            .unwrap();
        assert_eq!(rent["id"], json!(2));

        assert_eq!(
            store
                .insert_many(vec![record(json!({"name": "Fuel"})), record(json!({"id": 10, "name": "Gift"}))])
                .unwrap(),
            2
        );
        assert_eq!(store.find_by_id("10").unwrap().unwrap()["name"], json!("Gift"));
        assert_eq!(store.count(&Filter::new()).unwrap(), 4);
    }

    #[test]
    fn test_sparse_batch_binds_null_over_defaults() {
        let store = item_store();
        store
            .insert_many(vec![
                record(json!({"id": "a", "name": "Tea", "status": "Inactive"})),
                record(json!({"id": "b", "name": "Lunch"})),
            ])
            .unwrap();
        assert_eq!(store.find_by_id("b").unwrap().unwrap()["status"], Value::Null);

        store
            .insert_many(vec![record(json!({"id": "c", "name": "Coffee"}))])
            .unwrap();
        assert_eq!(store.find_by_id("c").unwrap().unwrap()["status"], json!("Active"));
    }

    #[test]
    fn test_insert_keeps_given_id_and_ignores_unknown_keys() {
        let store = item_store();
        let stored = store
            .insert_one(record(json!({"id": "abc", "name": "Tea", "colour": "green"})))
            .unwrap();
        assert_eq!(stored["id"], json!("abc"));
        assert!(!stored.contains_key("colour"));
    }

    #[test]
    fn test_empty_arguments_rejected() {
        let store = item_store();
        assert!(matches!(
            store.insert_one(Record::new()),
            Err(SpendwiseError::MissingArgument("record"))
        ));
        assert!(matches!(
            store.insert_many(Vec::new()),
            Err(SpendwiseError::MissingArgument("records"))
        ));
        assert!(matches!(
            store.find_by_id(""),
            Err(SpendwiseError::MissingArgument("id"))
        ));
        assert!(matches!(
            store.delete_many(&Filter::new()),
            Err(SpendwiseError::MissingArgument("filter"))
        ));
        assert!(matches!(
            store.update_by_id("x", &Record::new()),
            Err(SpendwiseError::MissingArgument("patch"))
        ));
    }

    #[test]
    fn test_find_with_filter() {
        let store = item_store();
        seed(&store);

        let rows = store
            .find(&Filter::new().eq("status", "Active").gt("price", 10000))
            .unwrap();
        let mut prices: Vec<f64> = rows.iter().filter_map(|r| r["price"].as_f64()).collect();
        prices.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(prices, vec![15000.0, 25000.0]);

        assert_eq!(store.find(&Filter::new()).unwrap().len(), 3);
        assert_eq!(store.count(&Filter::new().pattern("name", "^T")).unwrap(), 1);
    }

    #[test]
    fn test_find_with_sort_and_paging() {
        let store = item_store();
        seed(&store);

        let options = FindOptions::default()
            .sort_by("price", SortOrder::Desc)
            .limit(2)
            .offset(1);
        let rows = store.find_with(&Filter::new(), &options).unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r["name"].as_str()).collect();
        assert_eq!(names, vec!["Lunch", "Tea"]);

        let bad = FindOptions::default().sort_by("nope", SortOrder::Asc);
        assert!(store.find_with(&Filter::new(), &bad).is_err());
    }

    #[test]
    fn test_update_bumps_version_and_timestamp() {
        let store = item_store();
        let stored = store
            .insert_one(record(json!({
                "name": "Coffee",
                "updatedAt": "2020-01-01T00:00:00.000Z"
            })))
            .unwrap();
        let id = stored["id"].as_str().unwrap();

        let changed = store
            .update_by_id(id, &record(json!({"price": 30000, "_v": 41})))
            .unwrap();
        assert_eq!(changed, 1);

        let row = store.find_by_id(id).unwrap().unwrap();
        assert_eq!(row["_v"], json!(1));
        assert_eq!(row["price"], json!(30000.0));
        assert_ne!(row["updatedAt"], json!("2020-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_update_one_touches_single_row() {
        let store = item_store();
        seed(&store);

        let changed = store
            .update_one(
                &Filter::new().eq("status", "Active"),
                &record(json!({"status": "Inactive"})),
            )
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(store.count(&Filter::new().eq("status", "Inactive")).unwrap(), 1);

        let changed = store
            .update_many(
                &Filter::new().eq("status", "Active"),
                &record(json!({"status": "Inactive"})),
            )
            .unwrap();
        assert_eq!(changed, 2);
    }

    #[test]
    fn test_deletes() {
        let store = item_store();
        seed(&store);

        assert_eq!(store.delete_one(&Filter::new().gt("price", 0)).unwrap(), 1);
        assert_eq!(store.count(&Filter::new()).unwrap(), 2);

        let remaining = store.find(&Filter::new()).unwrap();
        let id = remaining[0]["id"].as_str().unwrap().to_string();
        assert_eq!(store.delete_by_id(&id).unwrap(), 1);
        assert_eq!(store.delete_by_id(&id).unwrap(), 0);

        assert_eq!(store.delete_all().unwrap(), 1);
        assert_eq!(store.count(&Filter::new()).unwrap(), 0);
    }

    #[test]
    fn test_insert_many_chunks_in_one_transaction() {
        let store = item_store();
        let records: Vec<Record> = (0..600)
            .map(|i| record(json!({"name": format!("item {}", i), "price": i})))
            .collect();
        assert_eq!(store.insert_many(records).unwrap(), 600);
        assert_eq!(store.count(&Filter::new()).unwrap(), 600);

        // A bad row rolls the whole batch back
        let records = vec![
            record(json!({"name": "ok"})),
            record(json!({"name": "bad", "status": "Deleted"})),
        ];
        assert!(store.insert_many(records).is_err());
        assert_eq!(store.count(&Filter::new()).unwrap(), 600);
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let store = item_store();
        store
            .insert_one(record(json!({"id": "a", "name": "Old"})))
            .unwrap();

        let written = store
            .upsert_many(vec![
                record(json!({"id": "a", "name": "New"})),
                record(json!({"id": "b", "name": "Fresh"})),
            ])
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.find_by_id("a").unwrap().unwrap()["name"], json!("New"));
        assert_eq!(store.count(&Filter::new()).unwrap(), 2);
    }

    #[test]
    fn test_table_sql() {
        let store = item_store();
        let sql = store.table_sql().unwrap().unwrap();
        assert!(sql.starts_with("CREATE TABLE"));
        assert!(sql.contains("status TEXT CHECK(status IN ('Active', 'Inactive'))"));
    }
}
