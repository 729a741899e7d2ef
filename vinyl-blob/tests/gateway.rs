use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_test::assert_ok;
use vinyl_blob::backends::MemoryStore;
use vinyl_blob::{
    BackendKind, BackendRegistry, DerivedFields, GatewayConfig, MemoryObjectIndex, MemoryPreferenceStore,
    ObjectId, ObjectIndex, RemoteRef, SharedBackend, StorageBackend, StorageError, StorageGateway,
    StorageResult, StoredObjectRef, UploadRequest, UserPreferences,
};
use vinyl_core::SubjectId;

const MP3: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x0fsome mpeg frames follow";

struct Harness {
    gateway: StorageGateway,
    object_store: Arc<MemoryStore>,
    drive: Arc<MemoryStore>,
    index: Arc<MemoryObjectIndex>,
}

fn harness_with(config: GatewayConfig, defaults: UserPreferences) -> Harness {
    let object_store = Arc::new(MemoryStore::new(BackendKind::ObjectStore));
    let drive = Arc::new(MemoryStore::new(BackendKind::CloudDrive));
    let index = Arc::new(MemoryObjectIndex::new());

    let backends = BackendRegistry::new()
        .with_provider(BackendKind::ObjectStore, SharedBackend::from_arc(object_store.clone()))
        .with_provider(BackendKind::CloudDrive, SharedBackend::from_arc(drive.clone()));
    let gateway = StorageGateway::new(
        backends,
        index.clone(),
        Arc::new(MemoryPreferenceStore::new(defaults)),
        config,
    );

    Harness {
        gateway,
        object_store,
        drive,
        index,
    }
}

fn harness() -> Harness {
    harness_with(GatewayConfig::default(), UserPreferences::default())
}

fn plaintext_prefs() -> UserPreferences {
    UserPreferences {
        encryption_enabled: false,
        backend: BackendKind::ObjectStore,
    }
}

fn gateway_over(backend: impl StorageBackend + 'static, config: GatewayConfig) -> StorageGateway {
    StorageGateway::new(
        BackendRegistry::new().with_provider(BackendKind::ObjectStore, SharedBackend::new(backend)),
        Arc::new(MemoryObjectIndex::new()),
        Arc::new(MemoryPreferenceStore::default()),
        config,
    )
}

/// Backend whose every call fails.
struct FailingStore;

#[async_trait]
impl StorageBackend for FailingStore {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    async fn put(&self, _key: &str, _bytes: Bytes, _content_type: &str) -> StorageResult<RemoteRef> {
        Err(StorageError::backend_msg("put", "connection refused"))
    }

    async fn get(&self, _remote: &RemoteRef) -> StorageResult<Bytes> {
        Err(StorageError::backend_msg("get", "connection refused"))
    }

    async fn delete(&self, _remote: &RemoteRef) -> StorageResult<()> {
        Err(StorageError::backend_msg("delete", "connection refused"))
    }

    async fn signed_url(&self, _remote: &RemoteRef, _ttl: Duration) -> StorageResult<String> {
        Err(StorageError::backend_msg("sign", "connection refused"))
    }
}

/// Backend that never answers within any sane timeout.
struct SlowStore;

#[async_trait]
impl StorageBackend for SlowStore {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    async fn put(&self, key: &str, _bytes: Bytes, _content_type: &str) -> StorageResult<RemoteRef> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(RemoteRef::new(key))
    }

    async fn get(&self, _remote: &RemoteRef) -> StorageResult<Bytes> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Bytes::new())
    }

    async fn delete(&self, _remote: &RemoteRef) -> StorageResult<()> {
        Ok(())
    }

    async fn signed_url(&self, remote: &RemoteRef, _ttl: Duration) -> StorageResult<String> {
        Ok(remote.to_string())
    }
}

/// Index that refuses every write.
struct FailingIndex;

#[async_trait]
impl ObjectIndex for FailingIndex {
    async fn insert(&self, _record: StoredObjectRef) -> StorageResult<()> {
        Err(StorageError::index("database is read-only"))
    }

    async fn get(&self, _id: &ObjectId) -> StorageResult<Option<StoredObjectRef>> {
        Ok(None)
    }

    async fn update_derived(&self, id: &ObjectId, _derived: DerivedFields) -> StorageResult<StoredObjectRef> {
        Err(StorageError::not_found(id.as_str()))
    }

    async fn remove(&self, _id: &ObjectId) -> StorageResult<Option<StoredObjectRef>> {
        Ok(None)
    }

    async fn list_for_owner(&self, _owner: &SubjectId) -> StorageResult<Vec<StoredObjectRef>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn encrypted_round_trip() {
    let h = harness();
    let owner = SubjectId::from("alice");

    let record = assert_ok!(
        h.gateway
            .upload(&owner, UploadRequest::new(MP3).with_title("demo"))
            .await
    );
    assert!(record.is_encrypted());
    assert_eq!(record.content_type, "audio/mpeg");
    assert_eq!(record.size_bytes, MP3.len() as u64);
    assert_eq!(record.title.as_deref(), Some("demo"));

    let (stored, stored_type) = h.object_store.raw(&record.remote).unwrap();
    assert_ne!(&stored[..], MP3);
    assert_eq!(stored_type, "application/octet-stream");

    let object = assert_ok!(h.gateway.download(&record.id, &owner).await);
    assert_eq!(&object.bytes[..], MP3);
}

#[tokio::test]
async fn plaintext_round_trip() {
    let h = harness_with(GatewayConfig::default(), plaintext_prefs());
    let owner = SubjectId::from("alice");

    let record = h.gateway.upload(&owner, UploadRequest::new(MP3)).await.unwrap();
    assert!(!record.is_encrypted());

    let (stored, stored_type) = h.object_store.raw(&record.remote).unwrap();
    assert_eq!(&stored[..], MP3);
    assert_eq!(stored_type, "audio/mpeg");

    let object = h.gateway.download(&record.id, &owner).await.unwrap();
    assert_eq!(&object.bytes[..], MP3);
}

#[tokio::test]
async fn declared_type_does_not_bypass_sniffing() {
    let h = harness();
    let request = UploadRequest::new(&b"just some notes, definitely not audio"[..])
        .with_declared_content_type("audio/mpeg");

    let err = h
        .gateway
        .upload(&SubjectId::from("alice"), request)
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::UnsupportedMediaType { ref detected } if detected == "text/plain"));
    assert!(h.object_store.is_empty());
    assert!(h.index.is_empty());
}

#[tokio::test]
async fn empty_and_oversized_uploads_are_rejected() {
    let h = harness_with(GatewayConfig::default().with_max_object_bytes(8), UserPreferences::default());
    let owner = SubjectId::from("alice");

    assert!(matches!(
        h.gateway.upload(&owner, UploadRequest::new(Bytes::new())).await,
        Err(StorageError::Invalid { .. })
    ));
    assert!(matches!(
        h.gateway.upload(&owner, UploadRequest::new(MP3)).await,
        Err(StorageError::TooLarge { max: 8, .. })
    ));
}

#[tokio::test]
async fn other_users_are_forbidden() {
    let h = harness();
    let alice = SubjectId::from("alice");
    let mallory = SubjectId::from("mallory");
    let record = h.gateway.upload(&alice, UploadRequest::new(MP3)).await.unwrap();

    assert!(matches!(
        h.gateway.download(&record.id, &mallory).await,
        Err(StorageError::Forbidden { .. })
    ));
    assert!(matches!(
        h.gateway.delete(&record.id, &mallory).await,
        Err(StorageError::Forbidden { .. })
    ));
    assert!(matches!(
        h.gateway.signed_url(&record.id, None, &mallory).await,
        Err(StorageError::Forbidden { .. })
    ));

    // Still there for its owner.
    assert!(h.gateway.download(&record.id, &alice).await.is_ok());
    assert!(h.gateway.list(&mallory).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_objects_are_not_found() {
    let h = harness();
    let owner = SubjectId::from("alice");
    let id = ObjectId::from("missing");

    assert!(matches!(
        h.gateway.download(&id, &owner).await,
        Err(StorageError::NotFound { .. })
    ));
    assert!(matches!(
        h.gateway.delete(&id, &owner).await,
        Err(StorageError::NotFound { .. })
    ));
}

#[tokio::test]
async fn failed_put_writes_no_metadata() {
    let index = Arc::new(MemoryObjectIndex::new());
    let gateway = StorageGateway::new(
        BackendRegistry::new().with_provider(BackendKind::ObjectStore, SharedBackend::new(FailingStore)),
        index.clone(),
        Arc::new(MemoryPreferenceStore::default()),
        GatewayConfig::default(),
    );

    let err = gateway
        .upload(&SubjectId::from("alice"), UploadRequest::new(MP3))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(index.is_empty());
}

#[tokio::test]
async fn failed_index_write_surfaces() {
    let store = Arc::new(MemoryStore::new(BackendKind::ObjectStore));
    let gateway = StorageGateway::new(
        BackendRegistry::new().with_provider(BackendKind::ObjectStore, SharedBackend::from_arc(store.clone())),
        Arc::new(FailingIndex),
        Arc::new(MemoryPreferenceStore::default()),
        GatewayConfig::default(),
    );

    let err = gateway
        .upload(&SubjectId::from("alice"), UploadRequest::new(MP3))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Index { .. }));
    // The bytes landed before the metadata write failed.
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn failed_remote_delete_keeps_metadata() {
    let index = Arc::new(MemoryObjectIndex::new());
    let owner = SubjectId::from("alice");
    let record = StoredObjectRef::new(
        ObjectId::from("obj-1"),
        owner.clone(),
        BackendKind::ObjectStore,
        RemoteRef::new("alice/2026/01/obj-1"),
        "audio/mpeg",
        10,
    );
    index.insert(record.clone()).await.unwrap();

    let gateway = StorageGateway::new(
        BackendRegistry::new().with_provider(BackendKind::ObjectStore, SharedBackend::new(FailingStore)),
        index.clone(),
        Arc::new(MemoryPreferenceStore::default()),
        GatewayConfig::default(),
    );

    let err = gateway.delete(&record.id, &owner).await.unwrap_err();
    assert!(matches!(err, StorageError::BackendFailure { operation: "delete", .. }));
    assert!(index.get(&record.id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_removes_bytes_and_record() {
    let h = harness();
    let owner = SubjectId::from("alice");
    let record = h.gateway.upload(&owner, UploadRequest::new(MP3)).await.unwrap();

    h.gateway.delete(&record.id, &owner).await.unwrap();

    assert!(h.object_store.is_empty());
    assert!(h.index.is_empty());
    assert!(matches!(
        h.gateway.download(&record.id, &owner).await,
        Err(StorageError::NotFound { .. })
    ));
}

#[tokio::test]
async fn slow_backends_time_out() {
    let gateway = gateway_over(
        SlowStore,
        GatewayConfig::default().with_backend_timeout(Duration::from_millis(20)),
    );

    let err = gateway
        .upload(&SubjectId::from("alice"), UploadRequest::new(MP3))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::BackendFailure { operation: "put", .. }));
}

#[tokio::test]
async fn objects_stay_on_their_original_backend() {
    let h = harness();
    let owner = SubjectId::from("alice");
    let first = h.gateway.upload(&owner, UploadRequest::new(MP3)).await.unwrap();

    h.gateway
        .set_preferences(
            &owner,
            UserPreferences {
                encryption_enabled: true,
                backend: BackendKind::CloudDrive,
            },
        )
        .await
        .unwrap();
    let second = h.gateway.upload(&owner, UploadRequest::new(MP3)).await.unwrap();

    assert_eq!(first.backend_kind, BackendKind::ObjectStore);
    assert_eq!(second.backend_kind, BackendKind::CloudDrive);
    assert_eq!(h.object_store.len(), 1);
    assert_eq!(h.drive.len(), 1);

    // Reads follow the record, not the current preference.
    let object = h.gateway.download(&first.id, &owner).await.unwrap();
    assert_eq!(&object.bytes[..], MP3);
    assert_eq!(h.gateway.list(&owner).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unregistered_backends_cannot_be_chosen() {
    let gateway = gateway_over(MemoryStore::new(BackendKind::ObjectStore), GatewayConfig::default());
    let err = gateway
        .set_preferences(
            &SubjectId::from("alice"),
            UserPreferences {
                encryption_enabled: false,
                backend: BackendKind::CloudDrive,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Invalid { .. }));
}

#[tokio::test]
async fn tampered_ciphertext_fails_to_open() {
    let h = harness();
    let owner = SubjectId::from("alice");
    let record = h.gateway.upload(&owner, UploadRequest::new(MP3)).await.unwrap();

    let (stored, _) = h.object_store.raw(&record.remote).unwrap();
    let mut tampered = stored.to_vec();
    tampered[0] ^= 0x01;
    assert!(h.object_store.overwrite(&record.remote, Bytes::from(tampered)));

    assert!(matches!(
        h.gateway.download(&record.id, &owner).await,
        Err(StorageError::Crypto(_))
    ));
}

#[tokio::test]
async fn downloads_reconcile_recorded_size() {
    let h = harness_with(GatewayConfig::default(), plaintext_prefs());
    let owner = SubjectId::from("alice");
    let record = h.gateway.upload(&owner, UploadRequest::new(MP3)).await.unwrap();

    let mut longer = MP3.to_vec();
    longer.extend_from_slice(b" and a trailer");
    h.object_store.overwrite(&record.remote, Bytes::from(longer.clone()));

    let object = h.gateway.download(&record.id, &owner).await.unwrap();
    assert_eq!(object.record.size_bytes, longer.len() as u64);

    let stored = h.index.get(&record.id).await.unwrap().unwrap();
    assert_eq!(stored.size_bytes, longer.len() as u64);
    assert_eq!(stored.backend_kind, record.backend_kind);
    assert_eq!(stored.owner_id, record.owner_id);
}

#[tokio::test]
async fn signed_urls_clamp_ttl_and_flag_ciphertext() {
    let h = harness_with(
        GatewayConfig::default().with_max_signed_url_ttl(Duration::from_secs(600)),
        UserPreferences::default(),
    );
    let owner = SubjectId::from("alice");
    let record = h.gateway.upload(&owner, UploadRequest::new(MP3)).await.unwrap();

    let before = chrono::Utc::now().timestamp();
    let signed = h
        .gateway
        .signed_url(&record.id, Some(Duration::from_secs(86_400)), &owner)
        .await
        .unwrap();

    assert!(signed.encrypted);
    assert!(signed.url.starts_with("memory://"));
    assert!(signed.expires_at >= before + 600);
    assert!(signed.expires_at <= chrono::Utc::now().timestamp() + 600);

    assert!(matches!(
        h.gateway.signed_url(&record.id, Some(Duration::ZERO), &owner).await,
        Err(StorageError::Invalid { .. })
    ));
}
