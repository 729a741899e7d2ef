use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Datelike;
use vinyl_core::SubjectId;

use crate::{BackendKind, ObjectId, RemoteRef, StorageResult};

/// Byte storage operations every backend variant implements.
///
/// Backends are stateless adapters over network calls. Failures come
/// back as `StorageError::BackendFailure`, or `NotFound` when the remote
/// object does not exist.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Store `bytes` under `key`, returning the backend's own reference
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StorageResult<RemoteRef>;

    async fn get(&self, remote: &RemoteRef) -> StorageResult<Bytes>;

    /// Removing an object that is already gone succeeds
    async fn delete(&self, remote: &RemoteRef) -> StorageResult<()>;

    /// Time-limited read URL; backends may clamp `ttl`
    async fn signed_url(&self, remote: &RemoteRef, ttl: Duration) -> StorageResult<String>;
}

/// Hands out the backend instance to use for a given owner.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    async fn backend_for(&self, owner: &SubjectId) -> StorageResult<Arc<dyn StorageBackend>>;
}

/// One process-wide backend shared by every owner.
#[derive(Clone)]
pub struct SharedBackend(Arc<dyn StorageBackend>);

impl SharedBackend {
    pub fn new<B: StorageBackend + 'static>(backend: B) -> Self {
        Self(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn StorageBackend>) -> Self {
        Self(backend)
    }
}

#[async_trait]
impl BackendProvider for SharedBackend {
    async fn backend_for(&self, _owner: &SubjectId) -> StorageResult<Arc<dyn StorageBackend>> {
        Ok(self.0.clone())
    }
}

/// Strategy for naming objects on a backend
pub trait KeyStrategy: Send + Sync {
    fn object_key(&self, owner: &SubjectId, id: &ObjectId) -> String;
}

/// Default key strategy: owner/year/month/object_id
#[derive(Debug, Clone, Default)]
pub struct DefaultKeyStrategy;

impl KeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, owner: &SubjectId, id: &ObjectId) -> String {
        let now = chrono::Utc::now();
        format!(
            "{}/{:04}/{:02}/{}",
            sanitize_segment(owner.as_str()),
            now.year(),
            now.month(),
            id
        )
    }
}

// Owner ids come from token claims; keep them to one path segment.
fn sanitize_segment(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys_are_owner_scoped() {
        let key = DefaultKeyStrategy.object_key(&SubjectId::from("user-1"), &ObjectId::from("abc"));
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "user-1");
        assert_eq!(parts[3], "abc");
    }

    #[test]
    fn owner_cannot_escape_its_prefix() {
        let key = DefaultKeyStrategy.object_key(&SubjectId::from("../other/x"), &ObjectId::from("abc"));
        assert!(key.starts_with(".._other_x/"));
    }
}
