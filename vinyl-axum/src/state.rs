use std::sync::Arc;

use vinyl_auth::CredentialValidator;
use vinyl_blob::backends::DriveCredentialStore;
use vinyl_blob::{ShareLinkStore, StorageGateway};

use crate::stream::RangeStreamer;

/// Process-wide handles shared by every request. Built once at startup.
pub struct VinylAxumState {
    pub gateway: Arc<StorageGateway>,
    pub validator: Arc<CredentialValidator>,
    pub shares: Arc<dyn ShareLinkStore>,
    /// Per-user cloud drive tokens
    pub drive: Arc<dyn DriveCredentialStore>,
    pub streamer: RangeStreamer,
}

impl Clone for VinylAxumState {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            validator: Arc::clone(&self.validator),
            shares: Arc::clone(&self.shares),
            drive: Arc::clone(&self.drive),
            streamer: self.streamer,
        }
    }
}

impl VinylAxumState {
    pub fn new(
        gateway: StorageGateway,
        validator: CredentialValidator,
        shares: Arc<dyn ShareLinkStore>,
        drive: Arc<dyn DriveCredentialStore>,
    ) -> Self {
        Self {
            gateway: Arc::new(gateway),
            validator: Arc::new(validator),
            shares,
            drive,
            streamer: RangeStreamer::default(),
        }
    }

    pub fn with_streamer(mut self, streamer: RangeStreamer) -> Self {
        self.streamer = streamer;
        self
    }
}
