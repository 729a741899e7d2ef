//! Wiring for the Vinyl service binary: settings in, router out.

pub mod settings;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use vinyl_auth::CredentialValidator;
use vinyl_axum::{VinylApp, VinylAxumState};
use vinyl_blob::backends::{
    DriveCredentialStore, DriveCredentials, DriveProvider, MemoryDriveCredentials, MemoryStore, S3Store,
};
use vinyl_blob::{
    BackendKind, BackendRegistry, MemoryObjectIndex, MemoryPreferenceStore, MemoryShareLinkStore, SharedBackend,
    StorageGateway,
};

pub use settings::Settings;

/// Builds the application from settings. Cloud-drive tokens are read
/// from `drive_credentials`; the connection routes write to the same store.
pub async fn build<C>(settings: &Settings, drive_credentials: Arc<C>) -> Result<VinylApp>
where
    C: DriveCredentials + DriveCredentialStore + 'static,
{
    let mut backends = BackendRegistry::new();

    match &settings.s3 {
        Some(s3) => {
            let store = S3Store::connect(s3.clone()).await?;
            info!(bucket = store.bucket(), "object store connected");
            backends.register(BackendKind::ObjectStore, Arc::new(SharedBackend::new(store)));
        }
        None => {
            warn!("no s3.bucket configured, object store is process-local");
            backends.register(
                BackendKind::ObjectStore,
                Arc::new(SharedBackend::new(MemoryStore::new(BackendKind::ObjectStore))),
            );
        }
    }

    let drive = DriveProvider::new(settings.drive.clone(), drive_credentials.clone())?;
    backends.register(BackendKind::CloudDrive, Arc::new(drive));

    let gateway = StorageGateway::new(
        backends,
        Arc::new(MemoryObjectIndex::new()),
        Arc::new(MemoryPreferenceStore::new(settings.defaults)),
        settings.gateway.clone(),
    );
    let validator = CredentialValidator::new(settings.auth.clone())?;
    let state = VinylAxumState::new(
        gateway,
        validator,
        Arc::new(MemoryShareLinkStore::new()),
        drive_credentials,
    );

    info!(
        default_backend = %settings.defaults.backend,
        encrypt_by_default = settings.defaults.encryption_enabled,
        "storage gateway ready"
    );
    Ok(VinylApp::with_body_limit(state, settings.http.max_body_bytes))
}

/// `build` with an in-memory drive token source.
pub async fn build_default(settings: &Settings) -> Result<VinylApp> {
    build(settings, Arc::new(MemoryDriveCredentials::new())).await
}
