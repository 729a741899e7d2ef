//! Query parameters and response views of the REST surface.

use serde::{Deserialize, Serialize};
use vinyl_blob::{BackendKind, StoredObjectRef};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlParams {
    pub expiration_seconds: Option<u64>,
}

/// Body of `PUT /storage/cloud-drive/connection`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveTokenBody {
    pub access_token: String,
}

/// An object record as clients see it. The envelope never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectView {
    pub id: String,
    pub title: Option<String>,
    pub content_type: String,
    pub size_bytes: u64,
    pub backend: BackendKind,
    pub encrypted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&StoredObjectRef> for ObjectView {
    fn from(record: &StoredObjectRef) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            content_type: record.content_type.clone(),
            size_bytes: record.size_bytes,
            backend: record.backend_kind,
            encrypted: record.is_encrypted(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<StoredObjectRef> for ObjectView {
    fn from(record: StoredObjectRef) -> Self {
        Self::from(&record)
    }
}
