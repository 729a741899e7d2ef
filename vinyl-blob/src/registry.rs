use std::collections::HashMap;
use std::sync::Arc;

use vinyl_core::SubjectId;

use crate::{BackendKind, BackendProvider, StorageBackend, StorageError, StorageResult};

/// Maps each backend kind to the provider that serves it.
///
/// Built once at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    providers: HashMap<BackendKind, Arc<dyn BackendProvider>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider<P: BackendProvider + 'static>(mut self, kind: BackendKind, provider: P) -> Self {
        self.providers.insert(kind, Arc::new(provider));
        self
    }

    pub fn register(&mut self, kind: BackendKind, provider: Arc<dyn BackendProvider>) {
        self.providers.insert(kind, provider);
    }

    pub fn supports(&self, kind: BackendKind) -> bool {
        self.providers.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        self.providers.keys().copied().collect()
    }

    pub async fn resolve(&self, kind: BackendKind, owner: &SubjectId) -> StorageResult<Arc<dyn StorageBackend>> {
        let provider = self
            .providers
            .get(&kind)
            .ok_or_else(|| StorageError::backend_msg("resolve", format!("no backend registered for {kind}")))?;
        provider.backend_for(owner).await
    }
}
