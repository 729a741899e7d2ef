use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::{BackendKind, RemoteRef, StorageBackend, StorageError, StorageResult};

/// S3 presigned URLs cannot outlive seven days.
const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Connection settings for an S3-compatible object store
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (RustFS, MinIO, Supabase storage S3 gateway); AWS when unset
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub force_path_style: bool,
}

impl S3Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("S3 bucket cannot be empty".to_string());
        }
        if self.region.is_empty() {
            return Err("S3 region cannot be empty".to_string());
        }
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err("S3 credentials are required".to_string());
        }
        Ok(())
    }
}

/// Generic object-store backend over the AWS SDK
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub async fn connect(config: S3Config) -> StorageResult<Self> {
        config.validate().map_err(StorageError::invalid)?;

        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "vinyl",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);
        if let Some(endpoint) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        );
        Ok(Self::from_client(client, config.bucket))
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl StorageBackend for S3Store {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StorageResult<RemoteRef> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(AwsByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::backend("put", e))?;

        debug!(bucket = %self.bucket, key, size, "object written");
        Ok(RemoteRef::new(key))
    }

    async fn get(&self, remote: &RemoteRef) -> StorageResult<Bytes> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(remote.as_str())
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StorageError::not_found(remote.as_str())
                } else {
                    StorageError::backend("get", err)
                }
            })?;

        let body = result
            .body
            .collect()
            .await
            .map_err(|e| StorageError::backend("get", e))?;
        Ok(body.into_bytes())
    }

    async fn delete(&self, remote: &RemoteRef) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(remote.as_str())
            .send()
            .await
            .map_err(|e| StorageError::backend("delete", e))?;
        Ok(())
    }

    async fn signed_url(&self, remote: &RemoteRef, ttl: Duration) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(ttl.min(MAX_PRESIGN_TTL))
            .map_err(|e| StorageError::backend("sign", e))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(remote.as_str())
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::backend("sign", e))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            bucket: "tracks".into(),
            region: "us-east-1".into(),
            endpoint_url: Some("http://localhost:9000".into()),
            access_key_id: "rustfsadmin".into(),
            secret_access_key: "rustfsadmin".into(),
            force_path_style: true,
        }
    }

    #[test]
    fn config_requires_bucket_and_credentials() {
        assert!(config().validate().is_ok());

        let mut missing_bucket = config();
        missing_bucket.bucket.clear();
        assert!(missing_bucket.validate().is_err());

        let mut missing_secret = config();
        missing_secret.secret_access_key.clear();
        assert!(missing_secret.validate().is_err());
    }

    #[tokio::test]
    async fn presigned_urls_are_local_and_clamped() {
        let store = S3Store::connect(config()).await.unwrap();
        let url = store
            .signed_url(&RemoteRef::new("u/2026/01/abc"), Duration::from_secs(30 * 24 * 3600))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/tracks/u/2026/01/abc?"));
        assert!(url.contains("X-Amz-Expires=604800"));
    }
}
