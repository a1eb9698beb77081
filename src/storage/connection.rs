//! SQLite engine with lazy connection and WAL/DELETE journal modes
//!
//! The connection is opened on first use and can be closed explicitly; the
//! next call after `close()` reopens it. Closing an in-memory database
//! discards its contents.

use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

use super::engine::{ColumnInfo, SqlEngine, Statement};
use super::value::SqlValue;
use crate::error::Result;
use crate::types::{Record, StorageConfig, StorageMode};

/// [`SqlEngine`] backed by a single rusqlite connection
pub struct SqliteEngine {
    config: StorageConfig,
    conn: Mutex<Option<Connection>>,
}

impl SqliteEngine {
    /// Prepare an engine; the database is opened on first use
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    /// Open the database immediately, surfacing path or pragma errors early
    pub fn open(config: StorageConfig) -> Result<Self> {
        let conn = Self::create_connection(&config)?;
        Ok(Self {
            config,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Private in-memory database (for tests and dry runs)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(StorageConfig::in_memory())
    }

    fn create_connection(config: &StorageConfig) -> Result<Connection> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(&config.db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            Connection::open_with_flags(&config.db_path, flags)?
        };

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        Self::configure_pragmas(&conn, config.storage_mode)?;

        tracing::debug!(
            path = %config.db_path,
            mode = ?config.storage_mode,
            "Opened SQLite connection"
        );
        Ok(conn)
    }

    /// Local mode keeps a WAL next to the database file. Cloud-safe mode
    /// keeps everything in the one file so it can be copied as a unit.
    fn configure_pragmas(conn: &Connection, mode: StorageMode) -> Result<()> {
        match mode {
            StorageMode::Local => {
                conn.execute_batch(
                    r#"
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA wal_autocheckpoint=1000;
                    PRAGMA cache_size=-16000;
                    PRAGMA temp_store=MEMORY;
                    "#,
                )?;
            }
            StorageMode::CloudSafe => {
                conn.execute_batch(
                    r#"
                    PRAGMA journal_mode=DELETE;
                    PRAGMA synchronous=FULL;
                    PRAGMA cache_size=-8000;
                    PRAGMA temp_store=MEMORY;
                    "#,
                )?;
            }
        }
        Ok(())
    }

    /// Execute a function with the connection, opening it if needed
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut guard = self.conn.lock();
        let conn = match guard.take() {
            Some(conn) => conn,
            None => Self::create_connection(&self.config)?,
        };
        f(guard.insert(conn))
    }

    /// Execute a function inside a transaction; rolled back on error
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;
            Ok(result)
        })
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.config.storage_mode
    }

    pub fn db_path(&self) -> &str {
        &self.config.db_path
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Database size in bytes
    pub fn db_size(&self) -> Result<i64> {
        self.with_connection(|conn| {
            let size: i64 = conn.query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get(0),
            )?;
            Ok(size)
        })
    }
}

fn query_rows(conn: &Connection, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
        let mut record = Record::new();
        for (idx, name) in names.iter().enumerate() {
            let value = SqlValue::from(row.get_ref(idx)?);
            record.insert(name.clone(), value.into_json());
        }
        Ok(record)
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

impl SqlEngine for SqliteEngine {
    fn execute(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "execute");
        self.with_connection(|conn| {
            conn.execute_batch(sql)?;
            // Cached SELECT * statements report stale columns after DDL
            conn.flush_prepared_statement_cache();
            Ok(())
        })
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>> {
        tracing::debug!(sql, params = params.len(), "query");
        self.with_connection(|conn| query_rows(conn, sql, params))
    }

    fn run(&self, sql: &str, params: &[SqlValue], use_transaction: bool) -> Result<usize> {
        tracing::debug!(sql, params = params.len(), use_transaction, "run");
        if use_transaction {
            self.with_transaction(|conn| Ok(conn.execute(sql, params_from_iter(params.iter()))?))
        } else {
            self.with_connection(|conn| Ok(conn.execute(sql, params_from_iter(params.iter()))?))
        }
    }

    fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<i64> {
        tracing::debug!(sql, params = params.len(), "insert");
        self.with_connection(|conn| {
            conn.execute(sql, params_from_iter(params.iter()))?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn transaction(&self, statements: &[Statement]) -> Result<usize> {
        tracing::debug!(statements = statements.len(), "transaction");
        self.with_transaction(|conn| {
            let mut changes = 0;
            for statement in statements {
                changes += conn.execute(&statement.sql, params_from_iter(statement.params.iter()))?;
            }
            // Batches carry migration DDL too
            conn.flush_prepared_statement_cache();
            Ok(changes)
        })
    }

    fn introspect_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)",
            )?;
            let columns = stmt
                .query_map([table], |row| {
                    Ok(ColumnInfo {
                        name: row.get(0)?,
                        declared_type: row.get(1)?,
                        not_null: row.get::<_, i64>(2)? != 0,
                        default_value: row.get(3)?,
                        primary_key: row.get::<_, i64>(4)? != 0,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(columns)
        })
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    fn list_indexes(&self, table: &str) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached("SELECT name FROM pragma_index_list(?1)")?;
            let names = stmt
                .query_map([table], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
    }

    fn close(&self) -> Result<()> {
        let conn = self.conn.lock().take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| e)?;
            tracing::debug!(path = %self.config.db_path, "Closed SQLite connection");
        }
        Ok(())
    }
}
