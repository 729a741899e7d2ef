use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::{BackendKind, RemoteRef, StorageBackend, StorageError, StorageResult};

#[derive(Debug, Clone)]
struct StoredBytes {
    bytes: Bytes,
    content_type: String,
}

/// Process-local backend. Used in tests and single-node development.
#[derive(Debug)]
pub struct MemoryStore {
    kind: BackendKind,
    objects: DashMap<String, StoredBytes>,
}

impl MemoryStore {
    /// A memory store standing in for backends of `kind`.
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            objects: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Bytes exactly as they were handed to `put`.
    pub fn raw(&self, remote: &RemoteRef) -> Option<(Bytes, String)> {
        self.objects
            .get(remote.as_str())
            .map(|o| (o.bytes.clone(), o.content_type.clone()))
    }

    /// Overwrites stored bytes in place, bypassing the gateway.
    pub fn overwrite(&self, remote: &RemoteRef, bytes: Bytes) -> bool {
        match self.objects.get_mut(remote.as_str()) {
            Some(mut o) => {
                o.bytes = bytes;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StorageResult<RemoteRef> {
        self.objects.insert(
            key.to_string(),
            StoredBytes {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(RemoteRef::new(key))
    }

    async fn get(&self, remote: &RemoteRef) -> StorageResult<Bytes> {
        self.objects
            .get(remote.as_str())
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::not_found(remote.as_str()))
    }

    async fn delete(&self, remote: &RemoteRef) -> StorageResult<()> {
        self.objects.remove(remote.as_str());
        Ok(())
    }

    async fn signed_url(&self, remote: &RemoteRef, ttl: Duration) -> StorageResult<String> {
        if !self.objects.contains_key(remote.as_str()) {
            return Err(StorageError::not_found(remote.as_str()));
        }
        let expires = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(format!("memory://{}?expires={}", remote, expires))
    }
}
