use async_trait::async_trait;
use dashmap::DashMap;
use vinyl_core::SubjectId;

use crate::{StorageResult, UserPreferences};

/// Where each user's storage policy lives.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Never fails for an unknown user; defaults apply instead
    async fn preferences(&self, owner: &SubjectId) -> StorageResult<UserPreferences>;

    async fn set_preferences(&self, owner: &SubjectId, prefs: UserPreferences) -> StorageResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    defaults: UserPreferences,
    entries: DashMap<SubjectId, UserPreferences>,
}

impl MemoryPreferenceStore {
    pub fn new(defaults: UserPreferences) -> Self {
        Self {
            defaults,
            entries: DashMap::new(),
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn preferences(&self, owner: &SubjectId) -> StorageResult<UserPreferences> {
        Ok(self.entries.get(owner).map(|p| *p).unwrap_or(self.defaults))
    }

    async fn set_preferences(&self, owner: &SubjectId, prefs: UserPreferences) -> StorageResult<()> {
        self.entries.insert(owner.clone(), prefs);
        Ok(())
    }
}
