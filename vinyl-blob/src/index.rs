use async_trait::async_trait;
use dashmap::DashMap;
use vinyl_core::SubjectId;

use crate::{DerivedFields, ObjectId, StorageError, StorageResult, StoredObjectRef};

/// Metadata store for object records.
#[async_trait]
pub trait ObjectIndex: Send + Sync {
    async fn insert(&self, record: StoredObjectRef) -> StorageResult<()>;

    async fn get(&self, id: &ObjectId) -> StorageResult<Option<StoredObjectRef>>;

    /// Replaces derived fields only; returns the updated record
    async fn update_derived(&self, id: &ObjectId, derived: DerivedFields) -> StorageResult<StoredObjectRef>;

    async fn remove(&self, id: &ObjectId) -> StorageResult<Option<StoredObjectRef>>;

    async fn list_for_owner(&self, owner: &SubjectId) -> StorageResult<Vec<StoredObjectRef>>;
}

/// Process-local index keyed by object id.
#[derive(Debug, Default)]
pub struct MemoryObjectIndex {
    records: DashMap<ObjectId, StoredObjectRef>,
}

impl MemoryObjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ObjectIndex for MemoryObjectIndex {
    async fn insert(&self, record: StoredObjectRef) -> StorageResult<()> {
        if self.records.contains_key(&record.id) {
            return Err(StorageError::index(format!("duplicate object id {}", record.id)));
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &ObjectId) -> StorageResult<Option<StoredObjectRef>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn update_derived(&self, id: &ObjectId, derived: DerivedFields) -> StorageResult<StoredObjectRef> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(id.as_str()))?;
        entry.apply(derived);
        Ok(entry.value().clone())
    }

    async fn remove(&self, id: &ObjectId) -> StorageResult<Option<StoredObjectRef>> {
        Ok(self.records.remove(id).map(|(_, r)| r))
    }

    async fn list_for_owner(&self, owner: &SubjectId) -> StorageResult<Vec<StoredObjectRef>> {
        let mut out: Vec<StoredObjectRef> = self
            .records
            .iter()
            .filter(|r| r.is_owned_by(owner))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(out)
    }
}
