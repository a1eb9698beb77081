//! Google Drive v3 client for the `appDataFolder` backup space

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::remote::{FileMeta, RemoteStore};
use crate::error::{Result, SpendwiseError};

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const FILE_FIELDS: &str = "id,name,mimeType";

/// [`RemoteStore`] over the Google Drive REST API
pub struct DriveClient {
    client: reqwest::Client,
    token: RwLock<Option<String>>,
    api_base: String,
    upload_base: String,
}

impl Default for DriveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveClient {
    pub fn new() -> Self {
        Self::with_endpoints(API_BASE, UPLOAD_BASE)
    }

    /// Client against alternate endpoints (a proxy or a local fake)
    pub fn with_endpoints(api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: RwLock::new(None),
            api_base: api_base.into(),
            upload_base: upload_base.into(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.token.read().as_deref() {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(SpendwiseError::RemoteIo("not logged in".to_string())),
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = self
            .authorized(request)?
            .send()
            .await
            .map_err(|e| SpendwiseError::RemoteIo(format!("{} failed: {}", action, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(SpendwiseError::RemoteIo(format!(
                "{} rejected: access token expired or revoked",
                action
            )));
        }
        let body = response.text().await.unwrap_or_default();
        Err(SpendwiseError::RemoteIo(format!(
            "{} failed with status {}: {}",
            action, status, body
        )))
    }
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileMeta>,
}

#[async_trait]
impl RemoteStore for DriveClient {
    fn set_access_token(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    async fn list_files(&self, scope: &str) -> Result<Vec<FileMeta>> {
        let request = self
            .client
            .get(format!("{}/files", self.api_base))
            .query(&[
                ("spaces", scope),
                ("orderBy", "modifiedTime desc"),
                ("fields", "files(id,name,mimeType)"),
            ]);
        let list: FileList = self
            .send(request, "list files")
            .await?
            .json()
            .await
            .map_err(|e| SpendwiseError::RemoteIo(format!("invalid file list: {}", e)))?;
        Ok(list.files)
    }

    async fn upload(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        scope: &str,
    ) -> Result<FileMeta> {
        let metadata = json!({
            "name": name,
            "mimeType": mime_type,
            "parents": [scope],
        });
        let metadata = Part::text(metadata.to_string())
            .mime_str("application/json")
            .map_err(|e| SpendwiseError::RemoteIo(e.to_string()))?;
        let media = Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(mime_type)
            .map_err(|e| SpendwiseError::RemoteIo(e.to_string()))?;
        let form = Form::new().part("metadata", metadata).part("file", media);

        let request = self
            .client
            .post(format!("{}/files", self.upload_base))
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .multipart(form);
        let meta: FileMeta = self
            .send(request, "upload")
            .await?
            .json()
            .await
            .map_err(|e| SpendwiseError::RemoteIo(format!("invalid upload response: {}", e)))?;

        tracing::info!(file_id = %meta.id, name, "Uploaded backup");
        Ok(meta)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let request = self
            .client
            .get(format!("{}/files/{}", self.api_base, file_id))
            .query(&[("alt", "media")]);
        let bytes = self
            .send(request, "download")
            .await?
            .bytes()
            .await
            .map_err(|e| SpendwiseError::RemoteIo(format!("download interrupted: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(format!("{}/files/{}", self.api_base, file_id));
        self.send(request, "delete").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_calls_without_token_fail_before_network() {
        let client = DriveClient::with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9");
        let err = client.list_files("appDataFolder").await.unwrap_err();
        assert!(matches!(err, SpendwiseError::RemoteIo(ref m) if m == "not logged in"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_file_list_parses_drive_payload() {
        let list: FileList = serde_json::from_str(
            r#"{"files": [{"id": "1x", "name": "SpendWise.json.gz", "mimeType": "application/gzip"}]}"#,
        )
        .unwrap();
        assert_eq!(list.files[0].id, "1x");
        assert_eq!(list.files[0].mime_type.as_deref(), Some("application/gzip"));

        let empty: FileList = serde_json::from_str("{}").unwrap();
        assert!(empty.files.is_empty());
    }
}
