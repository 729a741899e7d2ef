//! # Configuration
//!
//! A string key/value store with dotted keys (`auth.issuer`,
//! `storage.backend_timeout_secs`). Binaries fill it from the process
//! environment and read typed values from a snapshot:
//!
//! ```rust
//! use vinyl_core::VinylConfig;
//!
//! let mut config = VinylConfig::new();
//! config.set("storage.backend_timeout_secs", "15");
//!
//! let snap = config.snapshot();
//! assert_eq!(snap.get_u64("storage.backend_timeout_secs"), Some(15));
//! ```
//!
//! ## Environment overrides
//! `load_env` keeps variables starting with a prefix and normalises the
//! remainder, so `VINYL__AUTH__ISSUER` becomes `auth.issuer`:
//!
//! ```bash
//! export VINYL__STORAGE__DEFAULT_BACKEND=cloud-drive
//! ```

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct VinylConfig {
    values: HashMap<String, String>,
}

impl VinylConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Sets `key` only when nothing is stored for it yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Loads every `(name, value)` pair whose name starts with `prefix`.
    ///
    /// `VINYL__S3__BUCKET` with prefix `VINYL__` lands under `s3.bucket`.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if !normalized.is_empty() {
                    self.values.insert(normalized, value);
                }
            }
        }
    }

    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    pub fn snapshot(&self) -> VinylConfigSnapshot {
        VinylConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable copy of the config with typed getters.
#[derive(Debug, Clone, Default)]
pub struct VinylConfigSnapshot {
    map: HashMap<String, String>,
}

impl VinylConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    /// Non-empty string value.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    /// Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    pub fn get_duration_secs(&self, key: &str) -> Option<Duration> {
        self.get_u64(key).map(Duration::from_secs)
    }

    /// Comma separated list, blanks dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_style_keys_are_normalized() {
        let mut config = VinylConfig::new();
        config.load_vars(
            "VINYL__",
            vec![
                ("VINYL__AUTH__ISSUER".to_string(), "https://auth.example".to_string()),
                ("VINYL__STORAGE__ENCRYPT_BY_DEFAULT".to_string(), "no".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ],
        );

        let snap = config.snapshot();
        assert_eq!(snap.get("auth.issuer"), Some("https://auth.example"));
        assert_eq!(snap.get_bool("storage.encrypt_by_default"), Some(false));
        assert!(snap.get("home").is_none());
    }

    #[test]
    fn defaults_do_not_override() {
        let mut config = VinylConfig::new();
        config.set("http.port", "8080");
        config.set_default("http.port", "3030");
        config.set_default("http.host", "127.0.0.1");

        let snap = config.snapshot();
        assert_eq!(snap.get_u64("http.port"), Some(8080));
        assert_eq!(snap.get("http.host"), Some("127.0.0.1"));
    }

    #[test]
    fn typed_getters() {
        let mut config = VinylConfig::new();
        config.set("auth.audience", "authenticated, , mobile");
        config.set("storage.backend_timeout_secs", "12");
        config.set("bad.number", "twelve");
        config.set("empty", "  ");

        let snap = config.snapshot();
        assert_eq!(snap.get_list("auth.audience"), vec!["authenticated", "mobile"]);
        assert_eq!(
            snap.get_duration_secs("storage.backend_timeout_secs"),
            Some(Duration::from_secs(12))
        );
        assert_eq!(snap.get_u64("bad.number"), None);
        assert_eq!(snap.get_string("empty"), None);
    }
}
