//! Request extractors that run the credential validator.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use vinyl_auth::authorization_header;
use vinyl_core::{Principal, RequestContext, SubjectId};

use crate::{VinylAxumError, VinylAxumState};

const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_id(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// A caller with a valid bearer credential. Rejects with 401/403 otherwise.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub principal: Principal,
    pub request_id: Option<String>,
}

impl Authenticated {
    pub fn subject(&self) -> &SubjectId {
        &self.principal.subject_id
    }
}

impl FromRequestParts<VinylAxumState> for Authenticated {
    type Rejection = VinylAxumError;

    async fn from_request_parts(parts: &mut Parts, state: &VinylAxumState) -> Result<Self, Self::Rejection> {
        let principal = state.validator.validate(authorization_header(&parts.headers))?;
        Ok(Self {
            principal,
            request_id: request_id(parts),
        })
    }
}

/// Anonymous when no bearer credential was sent; a credential that was
/// sent must still be valid.
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub RequestContext);

impl FromRequestParts<VinylAxumState> for MaybeAuthenticated {
    type Rejection = VinylAxumError;

    async fn from_request_parts(parts: &mut Parts, state: &VinylAxumState) -> Result<Self, Self::Rejection> {
        let ctx = match state.validator.validate_optional(authorization_header(&parts.headers))? {
            Some(principal) => RequestContext::authenticated(principal),
            None => RequestContext::anonymous(),
        };
        Ok(Self(match request_id(parts) {
            Some(id) => ctx.with_request_id(id),
            None => ctx,
        }))
    }
}
