// Credential validation options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HMAC signing algorithms accepted for bearer tokens.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl JwtAlgorithm {
    pub(crate) fn as_jsonwebtoken(self) -> jsonwebtoken::Algorithm {
        match self {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

/// What a presented token must satisfy to yield a `Principal`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    /// JWT signing algorithm
    pub algorithm: JwtAlgorithm,
    /// Expected `iss` claim
    pub issuer: String,
    /// Accepted `aud` values; a token must carry at least one
    pub audience: Vec<String>,
    /// Role the token must carry in `role` or `roles`, when set
    pub role: Option<String>,
    /// Shared HMAC secret
    pub secret: Option<String>,
    /// Clock skew tolerated on `exp`
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
    /// Claim used for the principal's display label
    pub label_claim: String,
    /// Lifetime of tokens minted by `TokenIssuer`
    #[serde(with = "humantime_serde")]
    pub token_expires_in: Duration,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            issuer: String::new(),
            audience: vec!["authenticated".to_string()],
            role: None,
            secret: None,
            leeway: Duration::ZERO,
            label_claim: "email".to_string(),
            token_expires_in: Duration::from_secs(3600),
        }
    }
}

impl JwtOptions {
    pub fn builder() -> JwtOptionsBuilder {
        JwtOptionsBuilder::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.trim().is_empty() {
            return Err("JWT issuer cannot be empty".to_string());
        }

        if self.audience.iter().all(|a| a.trim().is_empty()) {
            return Err("JWT audience cannot be empty".to_string());
        }

        match self.secret.as_deref() {
            None => return Err("HMAC algorithms require a secret".to_string()),
            Some(s) if s.is_empty() => return Err("JWT secret cannot be empty".to_string()),
            Some(_) => {}
        }

        if matches!(self.role.as_deref(), Some(r) if r.trim().is_empty()) {
            return Err("JWT role, when set, cannot be blank".to_string());
        }

        if self.label_claim.is_empty() {
            return Err("label claim cannot be empty".to_string());
        }

        if self.token_expires_in.as_secs() == 0 {
            return Err("Token expiration must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct JwtOptionsBuilder {
    options: Option<JwtOptions>,
}

impl JwtOptionsBuilder {
    fn options(&mut self) -> &mut JwtOptions {
        self.options.get_or_insert_with(JwtOptions::default)
    }

    pub fn algorithm(mut self, algorithm: JwtAlgorithm) -> Self {
        self.options().algorithm = algorithm;
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.options().issuer = issuer.into();
        self
    }

    pub fn audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options().audience = audience.into_iter().map(Into::into).collect();
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.options().role = Some(role.into());
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.options().secret = Some(secret.into());
        self
    }

    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.options().leeway = leeway;
        self
    }

    pub fn label_claim(mut self, claim: impl Into<String>) -> Self {
        self.options().label_claim = claim.into();
        self
    }

    pub fn token_expires_in(mut self, ttl: Duration) -> Self {
        self.options().token_expires_in = ttl;
        self
    }

    pub fn build(self) -> JwtOptions {
        self.options.unwrap_or_default()
    }

    pub fn build_validated(self) -> Result<JwtOptions, String> {
        let options = self.build();
        options.validate()?;
        Ok(options)
    }
}
