use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use vinyl_auth::AuthError;
use vinyl_blob::{RangeError, StorageError};
use vinyl_core::{ErrorKind, VinylError};

#[derive(Debug)]
pub struct VinylAxumError(pub anyhow::Error);

impl From<anyhow::Error> for VinylAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<VinylError> for VinylAxumError {
    fn from(e: VinylError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<AuthError> for VinylAxumError {
    fn from(e: AuthError) -> Self {
        VinylError::from(e).into()
    }
}

impl From<StorageError> for VinylAxumError {
    fn from(e: StorageError) -> Self {
        VinylError::from(e).into()
    }
}

impl From<RangeError> for VinylAxumError {
    fn from(e: RangeError) -> Self {
        VinylError::from(e).into()
    }
}

impl IntoResponse for VinylAxumError {
    fn into_response(self) -> Response {
        // A VinylError anywhere in the chain keeps its kind and data.
        let safe = match VinylError::find_in(&self.0) {
            Some(err) => err.sanitize_for_client(),
            None => VinylError::general_error(self.0.to_string()),
        };

        if safe.kind.status_code() >= 500 {
            tracing::error!(error = %self.0, "request failed");
        }

        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(safe.to_json())).into_response();

        if safe.kind == ErrorKind::RangeNotSatisfiable {
            let content_range = safe
                .data
                .as_ref()
                .and_then(|d| d.get("contentRange"))
                .and_then(|v| v.as_str())
                .and_then(|v| HeaderValue::from_str(v).ok());
            if let Some(value) = content_range {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}
