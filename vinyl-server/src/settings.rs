//! Typed settings read from the key/value configuration.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use vinyl_auth::JwtOptions;
use vinyl_blob::backends::{DriveConfig, S3Config};
use vinyl_blob::{BackendKind, GatewayConfig, UserPreferences};
use vinyl_core::VinylConfigSnapshot;

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl HttpSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub http: HttpSettings,
    pub auth: JwtOptions,
    pub defaults: UserPreferences,
    pub gateway: GatewayConfig,
    /// Object store; absent when no bucket is configured
    pub s3: Option<S3Config>,
    pub drive: DriveConfig,
}

impl Settings {
    pub fn from_config(config: &VinylConfigSnapshot) -> Result<Self> {
        Ok(Self {
            http: http_settings(config)?,
            auth: auth_settings(config)?,
            defaults: default_preferences(config)?,
            gateway: gateway_settings(config)?,
            s3: s3_settings(config)?,
            drive: drive_settings(config),
        })
    }
}

fn http_settings(config: &VinylConfigSnapshot) -> Result<HttpSettings> {
    let port = match config.get_string("http.port") {
        Some(p) => p.parse().with_context(|| format!("http.port is not a port number: {p}"))?,
        None => 3030,
    };
    let max_body_bytes = megabytes(config, "http.max_body_mb")?.unwrap_or(100 * MB);
    Ok(HttpSettings {
        host: config.get_string("http.host").unwrap_or_else(|| "127.0.0.1".to_string()),
        port,
        max_body_bytes: usize::try_from(max_body_bytes)
            .with_context(|| format!("http.max_body_mb does not fit in memory: {max_body_bytes}"))?,
    })
}

/// A size given in megabytes, as bytes.
fn megabytes(config: &VinylConfigSnapshot, key: &str) -> Result<Option<u64>> {
    config
        .get_u64(key)
        .map(|mb| mb.checked_mul(MB).ok_or_else(|| anyhow!("{key} is too large: {mb}")))
        .transpose()
}

fn auth_settings(config: &VinylConfigSnapshot) -> Result<JwtOptions> {
    let mut builder = JwtOptions::builder()
        .issuer(config.get_string("auth.issuer").unwrap_or_default())
        .secret(
            config
                .get_string("auth.secret")
                .ok_or_else(|| anyhow!("auth.secret is required"))?,
        )
        .leeway(config.get_duration_secs("auth.leeway_secs").unwrap_or(Duration::ZERO));

    let audience = config.get_list("auth.audience");
    if !audience.is_empty() {
        builder = builder.audience(audience);
    }
    if let Some(role) = config.get_string("auth.role") {
        builder = builder.role(role);
    }
    if let Some(claim) = config.get_string("auth.label_claim") {
        builder = builder.label_claim(claim);
    }
    builder
        .build_validated()
        .map_err(|e| anyhow!("invalid auth settings: {e}"))
}

fn default_preferences(config: &VinylConfigSnapshot) -> Result<UserPreferences> {
    let backend = match config.get_string("storage.default_backend") {
        Some(kind) => kind.parse::<BackendKind>().map_err(|e| anyhow!(e))?,
        None => BackendKind::ObjectStore,
    };
    Ok(UserPreferences {
        encryption_enabled: config.get_bool("storage.encrypt_by_default").unwrap_or(true),
        backend,
    })
}

fn gateway_settings(config: &VinylConfigSnapshot) -> Result<GatewayConfig> {
    let defaults = GatewayConfig::default();
    let max_object_bytes = megabytes(config, "storage.max_object_mb")?.unwrap_or(defaults.max_object_bytes);
    Ok(GatewayConfig::new()
        .with_backend_timeout(
            config
                .get_duration_secs("storage.backend_timeout_secs")
                .unwrap_or(defaults.backend_timeout),
        )
        .with_max_object_bytes(max_object_bytes)
        .with_default_signed_url_ttl(
            config
                .get_duration_secs("storage.signed_url_ttl_secs")
                .unwrap_or(defaults.default_signed_url_ttl),
        )
        .with_max_signed_url_ttl(
            config
                .get_duration_secs("storage.max_signed_url_ttl_secs")
                .unwrap_or(defaults.max_signed_url_ttl),
        ))
}

fn s3_settings(config: &VinylConfigSnapshot) -> Result<Option<S3Config>> {
    let Some(bucket) = config.get_string("s3.bucket") else {
        return Ok(None);
    };
    let s3 = S3Config {
        bucket,
        region: config.get_string("s3.region").unwrap_or_else(|| "us-east-1".to_string()),
        endpoint_url: config.get_string("s3.endpoint_url"),
        access_key_id: config.get_string("s3.access_key_id").unwrap_or_default(),
        secret_access_key: config.get_string("s3.secret_access_key").unwrap_or_default(),
        force_path_style: config.get_bool("s3.force_path_style").unwrap_or(true),
    };
    s3.validate().map_err(|e| anyhow!("invalid s3 settings: {e}"))?;
    Ok(Some(s3))
}

fn drive_settings(config: &VinylConfigSnapshot) -> DriveConfig {
    let defaults = DriveConfig::default();
    DriveConfig {
        api_base: config.get_string("drive.api_base").unwrap_or(defaults.api_base),
        folder_id: config.get_string("drive.folder_id"),
        timeout: config
            .get_duration_secs("storage.backend_timeout_secs")
            .unwrap_or(defaults.timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vinyl_core::VinylConfig;

    fn config(pairs: &[(&str, &str)]) -> VinylConfigSnapshot {
        let mut config = VinylConfig::new();
        config.load_vars(
            "VINYL__",
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        );
        config.snapshot()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("VINYL__AUTH__SECRET", "super-secret-jwt-token-with-at-least-32-characters"),
            ("VINYL__AUTH__ISSUER", "https://project.supabase.co/auth/v1"),
        ]
    }

    #[test]
    fn defaults_apply() {
        let settings = Settings::from_config(&config(&minimal())).unwrap();

        assert_eq!(settings.http.addr(), "127.0.0.1:3030");
        assert_eq!(settings.http.max_body_bytes, 100 * 1024 * 1024);
        assert_eq!(settings.auth.audience, vec!["authenticated".to_string()]);
        assert_eq!(settings.defaults, UserPreferences::default());
        assert_eq!(settings.gateway.backend_timeout, Duration::from_secs(30));
        assert_eq!(settings.auth.leeway, Duration::ZERO);
        assert!(settings.s3.is_none());
        assert_eq!(settings.drive.api_base, "https://www.googleapis.com");
    }

    #[test]
    fn environment_overrides_are_typed() {
        let mut pairs = minimal();
        pairs.extend([
            ("VINYL__HTTP__PORT", "8080"),
            ("VINYL__AUTH__AUDIENCE", "authenticated, anon"),
            ("VINYL__AUTH__ROLE", "authenticated"),
            ("VINYL__STORAGE__DEFAULT_BACKEND", "cloud-drive"),
            ("VINYL__STORAGE__ENCRYPT_BY_DEFAULT", "off"),
            ("VINYL__STORAGE__BACKEND_TIMEOUT_SECS", "5"),
            ("VINYL__S3__BUCKET", "tracks"),
            ("VINYL__S3__ACCESS_KEY_ID", "key"),
            ("VINYL__S3__SECRET_ACCESS_KEY", "secret"),
        ]);
        let settings = Settings::from_config(&config(&pairs)).unwrap();

        assert_eq!(settings.http.port, 8080);
        assert_eq!(settings.auth.audience, vec!["authenticated", "anon"]);
        assert_eq!(settings.auth.role.as_deref(), Some("authenticated"));
        assert_eq!(settings.defaults.backend, BackendKind::CloudDrive);
        assert!(!settings.defaults.encryption_enabled);
        assert_eq!(settings.gateway.backend_timeout, Duration::from_secs(5));
        assert_eq!(settings.drive.timeout, Duration::from_secs(5));
        assert_eq!(settings.s3.unwrap().bucket, "tracks");
    }

    #[test]
    fn missing_secret_or_bad_values_fail() {
        assert!(Settings::from_config(&config(&[("VINYL__AUTH__ISSUER", "x")])).is_err());

        let mut pairs = minimal();
        pairs.push(("VINYL__STORAGE__DEFAULT_BACKEND", "ftp"));
        assert!(Settings::from_config(&config(&pairs)).is_err());

        let mut pairs = minimal();
        pairs.push(("VINYL__S3__BUCKET", "tracks"));
        assert!(Settings::from_config(&config(&pairs)).is_err());
    }

    #[test]
    fn oversized_megabyte_values_are_errors() {
        let huge = "18446744073709551615";
        for key in ["VINYL__HTTP__MAX_BODY_MB", "VINYL__STORAGE__MAX_OBJECT_MB"] {
            let mut pairs = minimal();
            pairs.push((key, huge));
            let err = Settings::from_config(&config(&pairs)).unwrap_err();
            assert!(err.to_string().contains("too large"), "{key}: {err}");
        }

        let mut pairs = minimal();
        pairs.push(("VINYL__STORAGE__MAX_OBJECT_MB", "5"));
        let settings = Settings::from_config(&config(&pairs)).unwrap();
        assert_eq!(settings.gateway.max_object_bytes, 5 * 1024 * 1024);
    }
}
