//! # vinyl-blob: owner-scoped audio object storage
//!
//! `vinyl-blob` stores users' audio files on pluggable backends, optionally
//! encrypted at rest, and keeps a metadata record for every object so
//! that reads, deletes and signed links can be checked against the owner
//! before any backend is touched.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use vinyl_blob::prelude::*;
//! use vinyl_blob::backends::MemoryStore;
//! use vinyl_core::SubjectId;
//!
//! # #[tokio::main]
//! # async fn main() -> StorageResult<()> {
//! let backends = BackendRegistry::new()
//!     .with_provider(BackendKind::ObjectStore, SharedBackend::new(MemoryStore::new(BackendKind::ObjectStore)));
//! let gateway = StorageGateway::new(
//!     backends,
//!     Arc::new(MemoryObjectIndex::new()),
//!     Arc::new(MemoryPreferenceStore::default()),
//!     GatewayConfig::default(),
//! );
//!
//! let owner = SubjectId::from("user-123");
//! let record = gateway
//!     .upload(&owner, UploadRequest::new(&b"ID3\x04\x00\x00\x00\x00\x00\x00"[..]))
//!     .await?;
//! let object = gateway.download(&record.id, &owner).await?;
//! assert_eq!(&object.bytes[..3], b"ID3");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  StorageGateway  │  ← ownership, sniffing, encryption, timeouts
//! ├──────────────────┤
//! │ BackendRegistry  │  ← kind → provider → per-owner backend
//! ├──────────────────┤
//! │  StorageBackend  │  ← object store, cloud drive, memory
//! └──────────────────┘
//! ```
//!
//! Metadata lives behind [`ObjectIndex`], user policy behind
//! [`PreferenceStore`]. Both ship with in-memory implementations.

pub mod backends;
mod config;
pub mod crypto;
mod error;
mod gateway;
mod index;
mod preferences;
pub mod range;
mod record;
mod registry;
mod share;
pub mod sniff;
pub mod store;
mod types;

pub use config::GatewayConfig;
pub use crypto::{CryptoError, EncryptionEngine, EncryptionEnvelope};
pub use error::{StorageError, StorageResult};
pub use gateway::{DownloadedObject, StorageGateway, UploadRequest};
pub use index::{MemoryObjectIndex, ObjectIndex};
pub use preferences::{MemoryPreferenceStore, PreferenceStore};
pub use range::{ByteRange, RangeError, RangeWindow};
pub use record::{DerivedFields, StoredObjectRef};
pub use registry::BackendRegistry;
pub use share::{MemoryShareLinkStore, NewShareLink, ShareAccess, ShareLink, ShareLinkStore, ShareStatus};
pub use store::{BackendProvider, DefaultKeyStrategy, KeyStrategy, SharedBackend, StorageBackend};
pub use types::{BackendKind, ObjectId, RemoteRef, SignedUrl, UserPreferences};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BackendKind, BackendRegistry, GatewayConfig, MemoryObjectIndex, MemoryPreferenceStore, ObjectId,
        SharedBackend, StorageError, StorageGateway, StorageResult, StoredObjectRef, UploadRequest,
    };
}
