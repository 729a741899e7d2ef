//! Bearer credential validation.
//!
//! A `CredentialValidator` is built once from `JwtOptions` and shared
//! read-only between requests. It verifies the HMAC signature, then
//! expiry, issuer and audience, then the optional role, and maps the
//! verified claims to a `Principal`.

use std::collections::BTreeSet;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::Value;
use tracing::{debug, warn};
use vinyl_core::Principal;

use crate::error::AuthError;
use crate::options::JwtOptions;

/// Returns the token part of an `Authorization` value using the Bearer scheme.
///
/// `Ok(None)` means the value uses some other scheme. The scheme name is
/// matched case-insensitively.
pub fn extract_bearer_token(value: &str) -> Result<Option<&str>, AuthError> {
    let value = value.trim();
    let Some((scheme, rest)) = value.split_once(' ') else {
        return if value.eq_ignore_ascii_case("bearer") {
            Err(AuthError::malformed("empty bearer token"))
        } else {
            Ok(None)
        };
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }
    let token = rest.trim();
    if token.is_empty() {
        return Err(AuthError::malformed("empty bearer token"));
    }
    Ok(Some(token))
}

/// Reads the `Authorization` header from an HTTP header map.
pub fn authorization_header(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

pub struct CredentialValidator {
    options: JwtOptions,
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("issuer", &self.options.issuer)
            .field("audience", &self.options.audience)
            .field("role", &self.options.role)
            .finish_non_exhaustive()
    }
}

impl CredentialValidator {
    pub fn new(options: JwtOptions) -> anyhow::Result<Self> {
        options.validate().map_err(anyhow::Error::msg)?;
        let secret = options.secret.as_deref().unwrap_or_default();

        let mut validation = Validation::new(options.algorithm.as_jsonwebtoken());
        validation.leeway = options.leeway.as_secs();
        validation.set_issuer(&[options.issuer.as_str()]);
        validation.set_audience(&options.audience);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            options,
        })
    }

    pub fn options(&self) -> &JwtOptions {
        &self.options
    }

    /// Validates the raw `Authorization` header value.
    pub fn validate(&self, authorization: Option<&str>) -> Result<Principal, AuthError> {
        let value = authorization
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::Missing)?;

        match extract_bearer_token(value) {
            Ok(Some(token)) => self.validate_token(token),
            Ok(None) => Err(AuthError::Missing),
            Err(err) => {
                warn!(reason = err.reason(), "rejected credential");
                Err(err)
            }
        }
    }

    /// Like `validate`, but a missing credential yields `Ok(None)`.
    pub fn validate_optional(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<Principal>, AuthError> {
        match self.validate(authorization) {
            Ok(p) => Ok(Some(p)),
            Err(AuthError::Missing) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Validates a bare token, without the scheme prefix.
    pub fn validate_token(&self, token: &str) -> Result<Principal, AuthError> {
        let result = decode::<Value>(token, &self.key, &self.validation)
            .map_err(map_jwt_error)
            .and_then(|data| self.principal_from_claims(&data.claims));

        match &result {
            Ok(p) => debug!(subject = %p.subject_id, "credential accepted"),
            Err(err) => warn!(reason = err.reason(), "rejected credential"),
        }
        result
    }

    fn principal_from_claims(&self, claims: &Value) -> Result<Principal, AuthError> {
        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::malformed("sub claim is not a string"))?;

        let roles = collect_roles(claims);
        if let Some(required) = &self.options.role {
            if !roles.contains(required) {
                return Err(AuthError::RoleMismatch);
            }
        }

        let label = [self.options.label_claim.as_str(), "name", "preferred_username"]
            .iter()
            .find_map(|claim| claims.get(*claim).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .unwrap_or(subject);

        Ok(Principal {
            subject_id: subject.into(),
            display_label: label.to_string(),
            roles,
        })
    }
}

fn collect_roles(claims: &Value) -> BTreeSet<String> {
    let mut roles = BTreeSet::new();
    if let Some(role) = claims.get("role").and_then(Value::as_str) {
        roles.insert(role.to_string());
    }
    if let Some(list) = claims.get("roles").and_then(Value::as_array) {
        roles.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
    }
    roles
}

fn map_jwt_error(err: JwtError) -> AuthError {
    match err.kind() {
        JwtErrorKind::ExpiredSignature => AuthError::Expired,
        JwtErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
        JwtErrorKind::InvalidAudience => AuthError::AudienceMismatch,
        JwtErrorKind::MissingRequiredClaim(claim) if claim == "iss" => AuthError::IssuerMismatch,
        JwtErrorKind::MissingRequiredClaim(claim) if claim == "aud" => AuthError::AudienceMismatch,
        _ => AuthError::malformed(err.to_string()),
    }
}
