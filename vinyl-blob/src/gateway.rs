use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};
use vinyl_core::SubjectId;

use crate::sniff::{self, OCTET_STREAM};
use crate::{
    BackendRegistry, DefaultKeyStrategy, DerivedFields, EncryptionEngine, GatewayConfig, KeyStrategy,
    ObjectId, ObjectIndex, PreferenceStore, SignedUrl, StorageError, StorageResult, StoredObjectRef,
    UserPreferences,
};

/// An upload as received from a client.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Bytes,
    /// What the client claims; logged, never trusted
    pub declared_content_type: Option<String>,
    pub title: Option<String>,
}

impl UploadRequest {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_content_type: None,
            title: None,
        }
    }

    pub fn with_declared_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.declared_content_type = Some(content_type.into());
        self
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Plaintext of an object together with its record.
#[derive(Debug, Clone)]
pub struct DownloadedObject {
    pub record: StoredObjectRef,
    pub bytes: Bytes,
}

/// Owner-scoped object storage over the registered backends.
///
/// Every read, delete and signing operation checks ownership against the
/// metadata record before any backend is touched. Records are written
/// only after the backend confirmed the bytes, and removed only after the
/// backend confirmed the delete.
pub struct StorageGateway {
    backends: BackendRegistry,
    index: Arc<dyn ObjectIndex>,
    preferences: Arc<dyn PreferenceStore>,
    keys: Arc<dyn KeyStrategy>,
    engine: EncryptionEngine,
    config: GatewayConfig,
}

impl StorageGateway {
    pub fn new(
        backends: BackendRegistry,
        index: Arc<dyn ObjectIndex>,
        preferences: Arc<dyn PreferenceStore>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            backends,
            index,
            preferences,
            keys: Arc::new(DefaultKeyStrategy),
            engine: EncryptionEngine::new(),
            config,
        }
    }

    pub fn with_key_strategy<K: KeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[instrument(skip_all, fields(owner = %owner, size = request.bytes.len()))]
    pub async fn upload(&self, owner: &SubjectId, request: UploadRequest) -> StorageResult<StoredObjectRef> {
        let size = request.bytes.len() as u64;
        if size == 0 {
            return Err(StorageError::invalid("upload is empty"));
        }
        if size > self.config.max_object_bytes {
            return Err(StorageError::TooLarge {
                size,
                max: self.config.max_object_bytes,
            });
        }

        let detected = sniff::detect_content_type(&request.bytes);
        if !sniff::is_audio(detected) {
            warn!(
                detected,
                declared = request.declared_content_type.as_deref().unwrap_or("-"),
                "rejected non-audio upload"
            );
            return Err(StorageError::UnsupportedMediaType {
                detected: detected.to_string(),
            });
        }
        if let Some(declared) = request.declared_content_type.as_deref() {
            if declared != detected {
                debug!(declared, detected, "declared content type ignored");
            }
        }

        let UserPreferences {
            encryption_enabled,
            backend: kind,
        } = self.preferences.preferences(owner).await?;

        let (payload, envelope) = if encryption_enabled {
            let (ciphertext, envelope) = self.engine.seal(&request.bytes)?;
            (Bytes::from(ciphertext), Some(envelope))
        } else {
            (request.bytes, None)
        };
        // Ciphertext is not audio to anyone reading the backend directly.
        let stored_type = if envelope.is_some() { OCTET_STREAM } else { detected };

        let id = ObjectId::new();
        let key = self.keys.object_key(owner, &id);
        let backend = self.backends.resolve(kind, owner).await?;
        let remote = self
            .bounded("put", &id, backend.put(&key, payload, stored_type))
            .await?;

        let mut record = StoredObjectRef::new(id, owner.clone(), kind, remote, detected, size);
        if let Some(envelope) = envelope {
            record = record.with_envelope(envelope);
        }
        if let Some(title) = request.title.filter(|t| !t.trim().is_empty()) {
            record = record.with_title(title);
        }

        if let Err(err) = self.index.insert(record.clone()).await {
            error!(object_id = %record.id, remote = %record.remote, error = %err, "metadata write failed, remote object orphaned");
            return Err(err);
        }

        info!(object_id = %record.id, backend = %kind, encrypted = record.is_encrypted(), "object stored");
        Ok(record)
    }

    #[instrument(skip_all, fields(object_id = %id, requester = %requester))]
    pub async fn download(&self, id: &ObjectId, requester: &SubjectId) -> StorageResult<DownloadedObject> {
        let record = self.owned_record(id, requester).await?;
        let backend = self.backends.resolve(record.backend_kind, &record.owner_id).await?;
        let data = self.bounded("get", id, backend.get(&record.remote)).await?;

        let bytes = match &record.envelope {
            Some(envelope) => match self.engine.open(&data, envelope) {
                Ok(plain) => Bytes::from(plain),
                Err(err) => {
                    error!(object_id = %id, error = %err, "stored object failed decryption");
                    return Err(err.into());
                }
            },
            None => data,
        };

        let record = self.reconcile_size(record, bytes.len() as u64).await;
        Ok(DownloadedObject { record, bytes })
    }

    #[instrument(skip_all, fields(object_id = %id, requester = %requester))]
    pub async fn delete(&self, id: &ObjectId, requester: &SubjectId) -> StorageResult<()> {
        let record = self.owned_record(id, requester).await?;
        let backend = self.backends.resolve(record.backend_kind, &record.owner_id).await?;

        self.bounded("delete", id, backend.delete(&record.remote)).await?;
        self.index.remove(id).await?;

        info!(object_id = %id, "object deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(object_id = %id, requester = %requester))]
    pub async fn signed_url(
        &self,
        id: &ObjectId,
        ttl: Option<Duration>,
        requester: &SubjectId,
    ) -> StorageResult<SignedUrl> {
        if ttl.is_some_and(|t| t.is_zero()) {
            return Err(StorageError::invalid("expiration must be at least one second"));
        }
        let record = self.owned_record(id, requester).await?;
        let ttl = self.config.signed_url_ttl(ttl);
        let backend = self.backends.resolve(record.backend_kind, &record.owner_id).await?;
        let url = self
            .bounded("sign", id, backend.signed_url(&record.remote, ttl))
            .await?;

        Ok(SignedUrl {
            url,
            expires_at: chrono::Utc::now().timestamp() + ttl.as_secs() as i64,
            encrypted: record.is_encrypted(),
        })
    }

    /// The record of `id`, after the ownership check.
    pub async fn describe(&self, id: &ObjectId, requester: &SubjectId) -> StorageResult<StoredObjectRef> {
        self.owned_record(id, requester).await
    }

    pub async fn list(&self, requester: &SubjectId) -> StorageResult<Vec<StoredObjectRef>> {
        self.index.list_for_owner(requester).await
    }

    pub async fn preferences(&self, owner: &SubjectId) -> StorageResult<UserPreferences> {
        self.preferences.preferences(owner).await
    }

    /// Replaces the owner's policy. Existing objects keep their backend.
    pub async fn set_preferences(&self, owner: &SubjectId, prefs: UserPreferences) -> StorageResult<()> {
        if !self.backends.supports(prefs.backend) {
            return Err(StorageError::invalid(format!("backend {} is not available", prefs.backend)));
        }
        self.preferences.set_preferences(owner, prefs).await?;
        info!(owner = %owner, backend = %prefs.backend, encryption = prefs.encryption_enabled, "preferences updated");
        Ok(())
    }

    async fn owned_record(&self, id: &ObjectId, requester: &SubjectId) -> StorageResult<StoredObjectRef> {
        let record = self
            .index
            .get(id)
            .await?
            .ok_or_else(|| StorageError::not_found(id.as_str()))?;
        if !record.is_owned_by(requester) {
            warn!(object_id = %id, requester = %requester, "ownership check failed");
            return Err(StorageError::forbidden(id.as_str()));
        }
        Ok(record)
    }

    async fn reconcile_size(&self, record: StoredObjectRef, observed: u64) -> StoredObjectRef {
        if record.size_bytes == observed {
            return record;
        }
        warn!(object_id = %record.id, recorded = record.size_bytes, observed, "size drift, updating record");
        match self.index.update_derived(&record.id, DerivedFields::size(observed)).await {
            Ok(updated) => updated,
            Err(err) => {
                warn!(object_id = %record.id, error = %err, "could not update record size");
                record
            }
        }
    }

    /// Runs a backend call under the configured timeout.
    async fn bounded<T, F>(&self, operation: &'static str, id: &ObjectId, call: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        match tokio::time::timeout(self.config.backend_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                if err.is_retryable() {
                    error!(object_id = %id, operation, error = %err, "backend call failed");
                } else {
                    warn!(object_id = %id, operation, error = %err, "backend call rejected");
                }
                Err(err)
            }
            Err(elapsed) => {
                error!(object_id = %id, operation, timeout = ?self.config.backend_timeout, "backend call timed out");
                Err(StorageError::backend(operation, elapsed))
            }
        }
    }
}
