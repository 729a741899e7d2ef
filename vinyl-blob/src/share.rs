//! Share links: bearer-less, revocable access to one object.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use vinyl_core::SubjectId;

use crate::{ObjectId, StorageError, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareAccess {
    /// Range-aware playback
    Stream,
    /// Whole-file download
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    Active,
    Revoked,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub id: String,
    pub token: String,
    pub owner_id: SubjectId,
    pub object_id: ObjectId,
    pub access: ShareAccess,
    pub status: ShareStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShareLink {
    pub fn new(owner_id: SubjectId, object_id: ObjectId, access: ShareAccess, ttl: Option<Duration>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            token: Uuid::new_v4().simple().to_string(),
            owner_id,
            object_id,
            access,
            status: ShareStatus::Active,
            created_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add_signed(ttl)),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Request to create a link.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShareLink {
    pub object_id: ObjectId,
    pub access: ShareAccess,
    pub expires_in_hours: Option<u32>,
}

#[async_trait]
pub trait ShareLinkStore: Send + Sync {
    async fn create(&self, owner: &SubjectId, request: NewShareLink) -> StorageResult<ShareLink>;

    /// Active links of `owner`
    async fn list_for_owner(&self, owner: &SubjectId) -> StorageResult<Vec<ShareLink>>;

    async fn get(&self, owner: &SubjectId, id: &str) -> StorageResult<ShareLink>;

    async fn revoke(&self, owner: &SubjectId, id: &str) -> StorageResult<ShareLink>;

    /// The active, unexpired link behind `token`
    async fn resolve(&self, token: &str) -> StorageResult<ShareLink>;
}

/// Concurrency-safe in-memory link store.
#[derive(Debug, Default)]
pub struct MemoryShareLinkStore {
    links: DashMap<String, ShareLink>,
    tokens: DashMap<String, String>,
}

impl MemoryShareLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShareLinkStore for MemoryShareLinkStore {
    async fn create(&self, owner: &SubjectId, request: NewShareLink) -> StorageResult<ShareLink> {
        if request.expires_in_hours == Some(0) {
            return Err(StorageError::invalid("expiresInHours must be at least 1"));
        }
        let ttl = request.expires_in_hours.map(|h| Duration::hours(i64::from(h)));
        let link = ShareLink::new(owner.clone(), request.object_id, request.access, ttl);

        self.tokens.insert(link.token.clone(), link.id.clone());
        self.links.insert(link.id.clone(), link.clone());
        info!(link_id = %link.id, object_id = %link.object_id, owner = %owner, "share link created");
        Ok(link)
    }

    async fn list_for_owner(&self, owner: &SubjectId) -> StorageResult<Vec<ShareLink>> {
        let now = Utc::now();
        let mut links: Vec<ShareLink> = self
            .links
            .iter()
            .filter(|l| &l.owner_id == owner && l.status == ShareStatus::Active && !l.is_expired_at(now))
            .map(|l| l.value().clone())
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }

    async fn get(&self, owner: &SubjectId, id: &str) -> StorageResult<ShareLink> {
        match self.links.get(id) {
            Some(link) if &link.owner_id == owner => Ok(link.clone()),
            _ => Err(StorageError::not_found(id)),
        }
    }

    async fn revoke(&self, owner: &SubjectId, id: &str) -> StorageResult<ShareLink> {
        let mut link = match self.links.get_mut(id) {
            Some(link) if &link.owner_id == owner => link,
            _ => return Err(StorageError::not_found(id)),
        };
        link.status = ShareStatus::Revoked;
        info!(link_id = %id, owner = %owner, "share link revoked");
        Ok(link.clone())
    }

    async fn resolve(&self, token: &str) -> StorageResult<ShareLink> {
        let not_found = || StorageError::not_found("share link");
        let id = self.tokens.get(token).map(|id| id.clone()).ok_or_else(not_found)?;
        let mut link = self.links.get_mut(&id).ok_or_else(not_found)?;

        if link.status == ShareStatus::Active && link.is_expired_at(Utc::now()) {
            link.status = ShareStatus::Expired;
        }
        if link.status != ShareStatus::Active {
            return Err(not_found());
        }
        Ok(link.clone())
    }
}
