use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    /// Generate a new random object ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reference a backend hands back from `put`: an object key for the
/// object store, a file id for the cloud drive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteRef(pub String);

impl RemoteRef {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend variants an object can live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    CloudDrive,
    ObjectStore,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::CloudDrive => "cloud-drive",
            BackendKind::ObjectStore => "object-store",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud-drive" | "cloud_drive" | "drive" | "google-drive" => Ok(BackendKind::CloudDrive),
            "object-store" | "object_store" | "s3" => Ok(BackendKind::ObjectStore),
            other => Err(format!("unknown backend kind: {other}")),
        }
    }
}

/// Per-user storage policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub encryption_enabled: bool,
    pub backend: BackendKind,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            encryption_enabled: true,
            backend: BackendKind::ObjectStore,
        }
    }
}

/// Signed URL handed back to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    pub url: String,
    /// Unix seconds; advisory for backends that do not expire links.
    pub expires_at: i64,
    /// The URL serves ciphertext when the object is encrypted at rest.
    pub encrypted: bool,
}
