//! Cloud-drive backend over the Google Drive v3 REST API.
//!
//! Each user stores into their own drive, so a `DriveStore` is bound to
//! one OAuth access token. `DriveProvider` builds one per request from
//! whatever `DriveCredentials` source the deployment wires in; obtaining
//! and refreshing those tokens happens outside this crate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use vinyl_core::SubjectId;

use crate::{BackendKind, BackendProvider, RemoteRef, StorageBackend, StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// `https://www.googleapis.com` unless pointed at a proxy
    pub api_base: String,
    /// Parent folder for uploads; drive root when unset
    pub folder_id: Option<String>,
    /// Request timeout for the HTTP client
    pub timeout: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com".to_string(),
            folder_id: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DriveConfig {
    fn files_url(&self, file_id: &str) -> String {
        format!("{}/drive/v3/files/{}", self.api_base.trim_end_matches('/'), file_id)
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id",
            self.api_base.trim_end_matches('/')
        )
    }
}

/// Source of per-user Drive access tokens
#[async_trait]
pub trait DriveCredentials: Send + Sync {
    async fn access_token(&self, owner: &SubjectId) -> StorageResult<String>;
}

/// Whether a user's drive is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConnection {
    pub connected: bool,
    /// Unix seconds
    pub connected_at: Option<i64>,
}

impl DriveConnection {
    fn disconnected() -> Self {
        Self {
            connected: false,
            connected_at: None,
        }
    }
}

/// Keeps the tokens the OAuth exchange yields, one per user.
#[async_trait]
pub trait DriveCredentialStore: Send + Sync {
    async fn store(&self, owner: &SubjectId, access_token: String) -> StorageResult<DriveConnection>;

    /// `true` when a token was removed
    async fn remove(&self, owner: &SubjectId) -> StorageResult<bool>;

    async fn status(&self, owner: &SubjectId) -> StorageResult<DriveConnection>;
}

#[derive(Debug, Clone)]
struct LinkedDrive {
    access_token: String,
    connected_at: i64,
}

/// Drive tokens kept in memory.
#[derive(Debug, Default)]
pub struct MemoryDriveCredentials {
    tokens: DashMap<SubjectId, LinkedDrive>,
}

impl MemoryDriveCredentials {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DriveCredentials for MemoryDriveCredentials {
    async fn access_token(&self, owner: &SubjectId) -> StorageResult<String> {
        self.tokens
            .get(owner)
            .map(|linked| linked.access_token.clone())
            .ok_or_else(|| StorageError::invalid("cloud drive is not connected for this user"))
    }
}

#[async_trait]
impl DriveCredentialStore for MemoryDriveCredentials {
    async fn store(&self, owner: &SubjectId, access_token: String) -> StorageResult<DriveConnection> {
        let access_token = access_token.trim().to_string();
        if access_token.is_empty() {
            return Err(StorageError::invalid("drive access token cannot be empty"));
        }
        let connected_at = chrono::Utc::now().timestamp();
        self.tokens.insert(
            owner.clone(),
            LinkedDrive {
                access_token,
                connected_at,
            },
        );
        info!(owner = %owner, "cloud drive connected");
        Ok(DriveConnection {
            connected: true,
            connected_at: Some(connected_at),
        })
    }

    async fn remove(&self, owner: &SubjectId) -> StorageResult<bool> {
        let removed = self.tokens.remove(owner).is_some();
        if removed {
            info!(owner = %owner, "cloud drive disconnected");
        }
        Ok(removed)
    }

    async fn status(&self, owner: &SubjectId) -> StorageResult<DriveConnection> {
        Ok(self
            .tokens
            .get(owner)
            .map(|linked| DriveConnection {
                connected: true,
                connected_at: Some(linked.connected_at),
            })
            .unwrap_or_else(DriveConnection::disconnected))
    }
}

pub struct DriveProvider {
    http: reqwest::Client,
    config: Arc<DriveConfig>,
    credentials: Arc<dyn DriveCredentials>,
}

impl DriveProvider {
    pub fn new(config: DriveConfig, credentials: Arc<dyn DriveCredentials>) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::backend("connect", e))?;
        Ok(Self {
            http,
            config: Arc::new(config),
            credentials,
        })
    }
}

#[async_trait]
impl BackendProvider for DriveProvider {
    async fn backend_for(&self, owner: &SubjectId) -> StorageResult<Arc<dyn StorageBackend>> {
        let token = self.credentials.access_token(owner).await?;
        Ok(Arc::new(DriveStore {
            http: self.http.clone(),
            config: self.config.clone(),
            access_token: token,
        }))
    }
}

/// Drive client bound to one user's token.
pub struct DriveStore {
    http: reqwest::Client,
    config: Arc<DriveConfig>,
    access_token: String,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileLinks {
    web_content_link: Option<String>,
    web_view_link: Option<String>,
}

impl DriveStore {
    fn metadata(&self, key: &str, content_type: &str) -> serde_json::Value {
        let mut meta = serde_json::json!({ "name": key, "mimeType": content_type });
        if let Some(folder) = &self.config.folder_id {
            meta["parents"] = serde_json::json!([folder]);
        }
        meta
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> StorageResult<reqwest::Response> {
        request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StorageError::backend(operation, e))
    }
}

/// Random per upload.
fn upload_boundary() -> String {
    format!("vinyl-{}", Uuid::new_v4().simple())
}

/// `multipart/related` body: JSON metadata part, then the media part.
fn related_body(boundary: &str, metadata: &serde_json::Value, content_type: &str, bytes: &[u8]) -> Bytes {
    let mut body = BytesMut::with_capacity(bytes.len() + 512);
    body.put_slice(format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes());
    body.put_slice(metadata.to_string().as_bytes());
    body.put_slice(format!("\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    body.put_slice(bytes);
    body.put_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body.freeze()
}

fn unexpected(operation: &'static str, status: StatusCode) -> StorageError {
    StorageError::backend_msg(operation, format!("drive responded with {status}"))
}

#[async_trait]
impl StorageBackend for DriveStore {
    fn kind(&self) -> BackendKind {
        BackendKind::CloudDrive
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StorageResult<RemoteRef> {
        let boundary = upload_boundary();
        let body = related_body(&boundary, &self.metadata(key, content_type), content_type, &bytes);
        let request = self
            .http
            .post(self.config.upload_url())
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);

        let response = self.send("put", request).await?;
        if !response.status().is_success() {
            return Err(unexpected("put", response.status()));
        }
        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| StorageError::backend("put", e))?;

        debug!(file_id = %created.id, size = bytes.len(), "drive file created");
        Ok(RemoteRef::new(created.id))
    }

    async fn get(&self, remote: &RemoteRef) -> StorageResult<Bytes> {
        let request = self
            .http
            .get(self.config.files_url(remote.as_str()))
            .query(&[("alt", "media")]);

        let response = self.send("get", request).await?;
        match response.status() {
            s if s.is_success() => response
                .bytes()
                .await
                .map_err(|e| StorageError::backend("get", e)),
            StatusCode::NOT_FOUND => Err(StorageError::not_found(remote.as_str())),
            s => Err(unexpected("get", s)),
        }
    }

    async fn delete(&self, remote: &RemoteRef) -> StorageResult<()> {
        let request = self.http.delete(self.config.files_url(remote.as_str()));
        let response = self.send("delete", request).await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            s => Err(unexpected("delete", s)),
        }
    }

    /// Drive has no expiring links; the TTL is ignored and the file's
    /// own download link is returned.
    async fn signed_url(&self, remote: &RemoteRef, _ttl: Duration) -> StorageResult<String> {
        let request = self
            .http
            .get(self.config.files_url(remote.as_str()))
            .query(&[("fields", "webContentLink,webViewLink")]);

        let response = self.send("sign", request).await?;
        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StorageError::not_found(remote.as_str())),
            s => return Err(unexpected("sign", s)),
        }
        let links: FileLinks = response
            .json()
            .await
            .map_err(|e| StorageError::backend("sign", e))?;

        links
            .web_content_link
            .or(links.web_view_link)
            .ok_or_else(|| StorageError::backend_msg("sign", "drive returned no link for file"))
    }
}
