use thiserror::Error;
use vinyl_core::VinylError;

/// Why a presented credential did not yield a principal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No bearer credential was presented")]
    Missing,

    #[error("Credential is malformed: {reason}")]
    Malformed { reason: String },

    #[error("Credential has expired")]
    Expired,

    #[error("Credential issuer does not match")]
    IssuerMismatch,

    #[error("Credential audience does not match")]
    AudienceMismatch,

    #[error("Credential lacks the required role")]
    RoleMismatch,
}

impl AuthError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Short tag for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Malformed { .. } => "malformed",
            AuthError::Expired => "expired",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::RoleMismatch => "role_mismatch",
        }
    }
}

impl From<AuthError> for VinylError {
    fn from(err: AuthError) -> Self {
        let data = serde_json::json!({ "reason": err.reason() });
        let v = if err == AuthError::RoleMismatch {
            VinylError::forbidden(err.to_string())
        } else {
            VinylError::not_authenticated(err.to_string())
        };
        v.with_data(data)
    }
}
