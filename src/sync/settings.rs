//! Application settings with dot-path access
//!
//! Settings are one JSON object. Paths such as `data.dateSync` address
//! nested keys; `set` creates missing intermediate objects and persists
//! immediately.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::{json, Map, Value};

use crate::error::{Result, SpendwiseError};

/// Remote id of the last uploaded backup
pub const KEY_FILE_ID: &str = "data.fileId";
/// When the last backup finished
pub const KEY_DATE_BACKUP: &str = "data.dateBackup";
/// Sync cursor: when the last successful sync finished
pub const KEY_DATE_SYNC: &str = "data.dateSync";

/// Bumping this discards stored settings on next load
pub const SETTINGS_VERSION: i64 = 1;

pub fn default_settings() -> Value {
    json!({
        "data": {
            "fileId": "",
            "dateBackup": "",
            "dateSync": "",
        },
        "version": SETTINGS_VERSION,
    })
}

pub trait SettingsStore: Send + Sync {
    fn get(&self, path: &str) -> Option<Value>;

    fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Non-empty string at `path`
    fn get_str(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let keys: Vec<&str> = path.split('.').collect();
    if keys.iter().any(|k| k.is_empty()) {
        return Err(SpendwiseError::InvalidInput(format!(
            "Invalid settings path '{}'",
            path
        )));
    }
    Ok(keys)
}

fn get_path(root: &Value, path: &str) -> Option<Value> {
    path.split('.')
        .try_fold(root, |node, key| node.get(key))
        .cloned()
}

fn set_path(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let keys = split_path(path)?;
    let Some((last, parents)) = keys.split_last() else {
        return Ok(());
    };

    let mut node = root;
    for key in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            unreachable!("node was just made an object")
        };
        let child = map.entry(key.to_string()).or_insert(Value::Null);
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        node = child;
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.to_string(), value);
    }
    Ok(())
}

/// Fill keys missing from `target` with `defaults`, recursively
fn merge_defaults(target: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    for (key, default) in defaults {
        match (target.get_mut(key), default) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_defaults(existing, nested)
            }
            (Some(_), _) => {}
            (None, _) => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}

/// Drop keys of `target` that `defaults` does not know, recursively
fn prune_unknown(target: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    target.retain(|key, _| defaults.contains_key(key));
    for (key, value) in target.iter_mut() {
        if let (Value::Object(existing), Some(Value::Object(nested))) = (value, defaults.get(key)) {
            prune_unknown(existing, nested);
        }
    }
}

/// Settings held only in memory
#[derive(Debug)]
pub struct MemorySettings {
    root: RwLock<Value>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new(default_settings())
    }
}

impl MemorySettings {
    pub fn new(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    pub fn snapshot(&self) -> Value {
        self.root.read().clone()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, path: &str) -> Option<Value> {
        get_path(&self.root.read(), path)
    }

    fn set(&self, path: &str, value: Value) -> Result<()> {
        set_path(&mut self.root.write(), path, value)
    }
}

/// Settings persisted as a pretty JSON file
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    root: RwLock<Value>,
}

impl JsonFileSettings {
    /// Load with the SpendWise defaults
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_defaults(path, default_settings())
    }

    /// Load `path`, reconciling it with `defaults`.
    ///
    /// A missing or unreadable file, or one whose `version` differs from
    /// the defaults, starts over from the defaults. Otherwise missing keys
    /// are filled in and keys the defaults do not know are dropped. The
    /// reconciled settings are written back.
    pub fn open_with_defaults(path: impl AsRef<Path>, defaults: Value) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stored = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable settings");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let root = match (stored, &defaults) {
            (Some(Value::Object(mut stored)), Value::Object(default_map))
                if stored.get("version") == default_map.get("version") =>
            {
                merge_defaults(&mut stored, default_map);
                prune_unknown(&mut stored, default_map);
                Value::Object(stored)
            }
            _ => defaults,
        };

        let settings = Self {
            path,
            root: RwLock::new(root),
        };
        settings.persist()?;
        Ok(settings)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&*self.root.read())?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, path: &str) -> Option<Value> {
        get_path(&self.root.read(), path)
    }

    fn set(&self, path: &str, value: Value) -> Result<()> {
        set_path(&mut self.root.write(), path, value)?;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_path_get_set() {
        let settings = MemorySettings::default();
        assert_eq!(settings.get(KEY_FILE_ID), Some(json!("")));
        assert_eq!(settings.get_str(KEY_FILE_ID), None);

        settings.set(KEY_FILE_ID, json!("abc")).unwrap();
        assert_eq!(settings.get_str(KEY_FILE_ID).as_deref(), Some("abc"));

        settings.set("general.theme.mode", json!("dark")).unwrap();
        assert_eq!(settings.get("general.theme.mode"), Some(json!("dark")));
        assert_eq!(settings.get("general.missing"), None);
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let settings = MemorySettings::new(json!({"a": 1}));
        settings.set("a.b", json!(true)).unwrap();
        assert_eq!(settings.snapshot(), json!({"a": {"b": true}}));
        assert!(settings.set("a..b", json!(1)).is_err());
    }

    #[test]
    fn test_file_settings_persist_on_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = JsonFileSettings::open(&path).unwrap();
        settings
            .set(KEY_DATE_SYNC, json!("2024-01-01T00:00:00.000Z"))
            .unwrap();

        let reopened = JsonFileSettings::open(&path).unwrap();
        assert_eq!(
            reopened.get_str(KEY_DATE_SYNC).as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn test_load_merges_defaults_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"data": {"fileId": "f1", "lastSync": "old"}, "stale": 1, "version": 1}"#,
        )
        .unwrap();

        let settings = JsonFileSettings::open(&path).unwrap();
        assert_eq!(settings.get_str(KEY_FILE_ID).as_deref(), Some("f1"));
        assert_eq!(settings.get(KEY_DATE_SYNC), Some(json!("")));
        assert_eq!(settings.get("data.lastSync"), None);
        assert_eq!(settings.get("stale"), None);
    }

    #[test]
    fn test_version_mismatch_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"data": {"fileId": "f1"}, "version": 0}"#).unwrap();

        let settings = JsonFileSettings::open(&path).unwrap();
        assert_eq!(settings.get_str(KEY_FILE_ID), None);
    }
}
