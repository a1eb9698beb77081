//! Core types for SpendWise

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SpendwiseError;

/// A stored row: column name -> JSON value
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Optimistic-concurrency version counter column
pub const VERSION_COLUMN: &str = "_v";
/// Creation timestamp column
pub const CREATED_AT_COLUMN: &str = "createdAt";
/// Last modification timestamp column
pub const UPDATED_AT_COLUMN: &str = "updatedAt";

/// Current time as an ISO-8601 UTC string with millisecond precision
/// (`2024-01-01T09:30:00.000Z`), the format every timestamp column uses.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database (`:memory:` for an in-memory database)
    pub db_path: String,
    /// Storage mode (local or cloud-safe)
    #[serde(default)]
    pub storage_mode: StorageMode,
    /// How long SQLite waits on a locked database before failing
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout() -> u64 {
    30_000
}

impl StorageConfig {
    /// Configuration for an on-disk database in local (WAL) mode
    pub fn local(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            storage_mode: StorageMode::Local,
            busy_timeout_ms: default_busy_timeout(),
        }
    }

    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self::local(":memory:")
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == ":memory:"
    }
}

/// Storage mode for SQLite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// WAL journal, for a database on local device storage
    #[default]
    Local,
    /// DELETE journal, for a database file that is itself copied around
    CloudSafe,
}

impl std::str::FromStr for StorageMode {
    type Err = SpendwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(StorageMode::Local),
            "cloud-safe" | "cloud_safe" => Ok(StorageMode::CloudSafe),
            other => Err(SpendwiseError::Config(format!(
                "Unknown storage mode '{}'. Valid modes: local, cloud-safe",
                other
            ))),
        }
    }
}

/// Remote backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote folder holding the backup blob
    #[serde(default = "default_folder_scope")]
    pub folder_scope: String,
    /// Name of the uploaded backup blob
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Mime type of the uploaded backup blob
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_folder_scope() -> String {
    "appDataFolder".to_string()
}

fn default_file_name() -> String {
    "SpendWise.json.gz".to_string()
}

fn default_mime_type() -> String {
    "application/gzip".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            folder_scope: default_folder_scope(),
            file_name: default_file_name(),
            mime_type: default_mime_type(),
        }
    }
}

/// Uniform outcome returned by backup, import and sync entry points.
///
/// These operations never propagate errors to their caller; the error, if
/// any, is carried here next to a human readable message.
#[derive(Debug)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    pub error: Option<SpendwiseError>,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: SpendwiseError) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error),
        }
    }
}
