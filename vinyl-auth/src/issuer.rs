use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::options::JwtOptions;

/// Mints tokens that a `CredentialValidator` built from the same
/// options accepts. Used by tests and local tooling; production tokens
/// come from the external identity provider.
pub struct TokenIssuer {
    options: JwtOptions,
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(options: JwtOptions) -> anyhow::Result<Self> {
        options.validate().map_err(anyhow::Error::msg)?;
        let key = EncodingKey::from_secret(options.secret.as_deref().unwrap_or_default().as_bytes());
        Ok(Self { options, key })
    }

    /// Standard claims for `subject`: iss, aud, sub, iat, exp, jti and
    /// the configured role.
    pub fn claims_for(&self, subject: &str) -> Map<String, Value> {
        let now = Utc::now().timestamp();
        let exp = now + self.options.token_expires_in.as_secs() as i64;

        let mut claims = Map::new();
        claims.insert("iss".into(), json!(self.options.issuer));
        claims.insert("aud".into(), json!(self.options.audience));
        claims.insert("sub".into(), json!(subject));
        claims.insert("iat".into(), json!(now));
        claims.insert("exp".into(), json!(exp));
        claims.insert("jti".into(), json!(Uuid::new_v4().to_string()));
        if let Some(role) = &self.options.role {
            claims.insert("role".into(), json!(role));
        }
        claims
    }

    pub fn sign_claims(&self, claims: &Map<String, Value>) -> anyhow::Result<String> {
        let header = Header::new(self.options.algorithm.as_jsonwebtoken());
        Ok(encode(&header, claims, &self.key)?)
    }

    pub fn issue(&self, subject: &str) -> anyhow::Result<String> {
        self.sign_claims(&self.claims_for(subject))
    }
}
