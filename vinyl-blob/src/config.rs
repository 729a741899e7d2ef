use std::time::Duration;

/// Configuration for gateway operations
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upper bound for every backend network call
    pub backend_timeout: Duration,

    /// Absolute max size allowed for a single upload (safety guard)
    pub max_object_bytes: u64,

    /// TTL used when a signed URL request names none
    pub default_signed_url_ttl: Duration,

    /// Longest TTL the gateway will pass to a backend
    pub max_signed_url_ttl: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(30),
            max_object_bytes: 100 * 1024 * 1024, // 100MB
            default_signed_url_ttl: Duration::from_secs(3600),
            max_signed_url_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_max_object_bytes(mut self, bytes: u64) -> Self {
        self.max_object_bytes = bytes;
        self
    }

    pub fn with_default_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.default_signed_url_ttl = ttl;
        self
    }

    pub fn with_max_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.max_signed_url_ttl = ttl;
        self
    }

    /// Picks the TTL to request from a backend.
    pub fn signed_url_ttl(&self, requested: Option<Duration>) -> Duration {
        requested
            .unwrap_or(self.default_signed_url_ttl)
            .min(self.max_signed_url_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_and_clamps() {
        let config = GatewayConfig::new().with_max_signed_url_ttl(Duration::from_secs(600));
        assert_eq!(config.signed_url_ttl(None), Duration::from_secs(600));
        assert_eq!(
            config.signed_url_ttl(Some(Duration::from_secs(60))),
            Duration::from_secs(60)
        );
        assert_eq!(
            config.signed_url_ttl(Some(Duration::from_secs(86_400))),
            Duration::from_secs(600)
        );
    }
}
