//! # Errors
//!
//! Vinyl keeps one structured error type that every domain error
//! (authentication, encryption, storage, range) is converted into before
//! it reaches a transport.
//!
//! - each kind has a fixed status code, name and class name
//! - a `VinylError` can ride inside `anyhow::Error` and be found again
//!   with a downcast
//! - the transport crate decides how to render it
//!
//! With feature `serde` the optional `data` payload is a
//! `serde_json::Value` and `to_json()` is available.

use std::fmt;

use anyhow::Error as AnyError;

macro_rules! error_kinds {
    ($( $(#[$doc:meta])* $kind:ident => $code:literal, $name:literal, $class:literal, $ctor:ident; )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorKind {
            $( $(#[$doc])* $kind, )*
        }

        impl ErrorKind {
            pub fn status_code(&self) -> u16 {
                match self {
                    $( ErrorKind::$kind => $code, )*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( ErrorKind::$kind => $name, )*
                }
            }

            /// Kebab-cased class name sent to clients.
            pub fn class_name(&self) -> &'static str {
                match self {
                    $( ErrorKind::$kind => $class, )*
                }
            }
        }

        impl VinylError {
            $(
                pub fn $ctor(msg: impl Into<String>) -> Self {
                    Self::new(ErrorKind::$kind, msg)
                }
            )*
        }
    };
}

error_kinds! {
    BadRequest => 400, "BadRequest", "bad-request", bad_request;
    /// Missing or rejected credential
    NotAuthenticated => 401, "NotAuthenticated", "not-authenticated", not_authenticated;
    Forbidden => 403, "Forbidden", "forbidden", forbidden;
    NotFound => 404, "NotFound", "not-found", not_found;
    PayloadTooLarge => 413, "PayloadTooLarge", "payload-too-large", payload_too_large;
    UnsupportedMedia => 415, "UnsupportedMediaType", "unsupported-media-type", unsupported_media;
    RangeNotSatisfiable => 416, "RangeNotSatisfiable", "range-not-satisfiable", range_not_satisfiable;
    GeneralError => 500, "GeneralError", "general-error", general_error;
    /// Backend unreachable or timed out; retryable
    Unavailable => 503, "Unavailable", "unavailable", unavailable;
}

impl ErrorKind {
    /// 5xx kinds a client may retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Unavailable)
    }
}

#[cfg(feature = "serde")]
pub type ErrorValue = serde_json::Value;

#[cfg(not(feature = "serde"))]
pub type ErrorValue = std::sync::Arc<dyn std::any::Any + Send + Sync>;

/// A structured error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct VinylError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<ErrorValue>,
    pub source: Option<AnyError>,
}

impl VinylError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: ErrorValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: impl Into<AnyError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Looks for a `VinylError` anywhere in the chain of an `anyhow::Error`.
    pub fn find_in(err: &AnyError) -> Option<&VinylError> {
        err.chain().find_map(|e| e.downcast_ref::<VinylError>())
    }

    /// Copy without the inner source, safe to hand to clients.
    pub fn sanitize_for_client(&self) -> VinylError {
        VinylError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            source: None,
        }
    }
}

impl fmt::Display for VinylError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for VinylError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl VinylError {
    /// JSON body: `{ name, message, code, className, data? }`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_http_codes() {
        assert_eq!(ErrorKind::UnsupportedMedia.status_code(), 415);
        assert_eq!(ErrorKind::UnsupportedMedia.name(), "UnsupportedMediaType");
        assert_eq!(ErrorKind::RangeNotSatisfiable.status_code(), 416);
        assert_eq!(ErrorKind::Unavailable.status_code(), 503);
        assert!(ErrorKind::Unavailable.is_retryable());
        assert!(!ErrorKind::Forbidden.is_retryable());
    }

    #[test]
    fn find_in_walks_context_chain() {
        let err = VinylError::not_found("track 7")
            .into_anyhow()
            .context("while streaming");
        let found = VinylError::find_in(&err).map(|v| v.kind);
        assert_eq!(found, Some(ErrorKind::NotFound));
    }

    #[test]
    fn sanitize_drops_source() {
        let err = VinylError::unavailable("backend down").with_source(anyhow::anyhow!("connection reset"));
        assert!(err.source.is_some());
        let safe = err.sanitize_for_client();
        assert!(safe.source.is_none());
        assert_eq!(safe.kind, ErrorKind::Unavailable);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_shape() {
        let body = VinylError::forbidden("not yours")
            .with_data(serde_json::json!({ "reason": "owner" }))
            .to_json();
        assert_eq!(body["code"], 403);
        assert_eq!(body["className"], "forbidden");
        assert_eq!(body["data"]["reason"], "owner");
    }
}
