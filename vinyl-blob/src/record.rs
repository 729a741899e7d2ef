use serde::{Deserialize, Serialize};
use vinyl_core::SubjectId;

use crate::crypto::EncryptionEnvelope;
use crate::{BackendKind, ObjectId, RemoteRef};

/// Metadata record for one stored object.
///
/// `id`, `owner_id`, `backend_kind` and `envelope` are fixed at upload;
/// only the fields in [`DerivedFields`] are ever replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObjectRef {
    pub id: ObjectId,
    pub owner_id: SubjectId,
    pub backend_kind: BackendKind,
    pub content_type: String,
    /// Plaintext size
    pub size_bytes: u64,
    pub envelope: Option<EncryptionEnvelope>,
    pub remote: RemoteRef,
    pub title: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StoredObjectRef {
    pub fn new(
        id: ObjectId,
        owner_id: SubjectId,
        backend_kind: BackendKind,
        remote: RemoteRef,
        content_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            owner_id,
            backend_kind,
            content_type: content_type.into(),
            size_bytes,
            envelope: None,
            remote,
            title: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_envelope(mut self, envelope: EncryptionEnvelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.envelope.is_some()
    }

    pub fn is_owned_by(&self, subject: &SubjectId) -> bool {
        &self.owner_id == subject
    }

    /// Replaces the derived fields that are set in `derived`.
    pub fn apply(&mut self, derived: DerivedFields) {
        if let Some(size) = derived.size_bytes {
            self.size_bytes = size;
        }
        if let Some(ct) = derived.content_type {
            self.content_type = ct;
        }
        if let Some(remote) = derived.remote {
            self.remote = remote;
        }
        self.updated_at = chrono::Utc::now().timestamp();
    }
}

/// Fields a metadata update may replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedFields {
    pub size_bytes: Option<u64>,
    pub content_type: Option<String>,
    pub remote: Option<RemoteRef>,
}

impl DerivedFields {
    pub fn size(size_bytes: u64) -> Self {
        Self {
            size_bytes: Some(size_bytes),
            ..Self::default()
        }
    }
}
