//! Remote blob storage used for backups

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpendwiseError};

/// Metadata of one remote file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A folder-scoped blob store reachable with a bearer token
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Replace the access token used for subsequent calls
    fn set_access_token(&self, token: &str);

    /// Files in `scope`, most recently modified first
    async fn list_files(&self, scope: &str) -> Result<Vec<FileMeta>>;

    async fn upload(&self, name: &str, mime_type: &str, bytes: Vec<u8>, scope: &str)
        -> Result<FileMeta>;

    async fn download(&self, file_id: &str) -> Result<Vec<u8>>;

    async fn delete(&self, file_id: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct StoredFile {
    meta: FileMeta,
    scope: String,
    bytes: Vec<u8>,
    seq: u64,
}

/// In-process [`RemoteStore`], for tests and offline use
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    files: Mutex<BTreeMap<String, StoredFile>>,
    token: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token passed to the last `set_access_token` call
    pub fn access_token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    fn authorized(&self) -> Result<()> {
        if self.token.lock().is_none() {
            return Err(SpendwiseError::RemoteIo(
                "no access token set".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    fn set_access_token(&self, token: &str) {
        *self.token.lock() = Some(token.to_string());
    }

    async fn list_files(&self, scope: &str) -> Result<Vec<FileMeta>> {
        self.authorized()?;
        let files = self.files.lock();
        let mut matching: Vec<&StoredFile> = files.values().filter(|f| f.scope == scope).collect();
        matching.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(matching.into_iter().map(|f| f.meta.clone()).collect())
    }

    async fn upload(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        scope: &str,
    ) -> Result<FileMeta> {
        self.authorized()?;
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let meta = FileMeta {
            id: format!("mem-{}", seq),
            name: name.to_string(),
            mime_type: Some(mime_type.to_string()),
        };
        self.files.lock().insert(
            meta.id.clone(),
            StoredFile {
                meta: meta.clone(),
                scope: scope.to_string(),
                bytes,
                seq,
            },
        );
        Ok(meta)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        self.authorized()?;
        self.files
            .lock()
            .get(file_id)
            .map(|f| f.bytes.clone())
            .ok_or_else(|| SpendwiseError::RemoteIo(format!("file {} not found", file_id)))
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        self.authorized()?;
        self.files
            .lock()
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| SpendwiseError::RemoteIo(format!("file {} not found", file_id)))
    }
}
