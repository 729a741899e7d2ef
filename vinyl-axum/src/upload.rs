//! Multipart upload form: a `file` part and an optional `title` part.

use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use bytes::Bytes;
use vinyl_blob::UploadRequest;
use vinyl_core::VinylError;

use crate::VinylAxumError;

#[derive(Debug, Clone)]
pub struct UploadForm {
    pub file: Bytes,
    pub file_name: Option<String>,
    /// Client-declared type of the `file` part
    pub content_type: Option<String>,
    pub title: Option<String>,
}

impl UploadForm {
    /// Title falls back to the uploaded file name.
    pub fn into_request(self) -> UploadRequest {
        let mut request = UploadRequest::new(self.file);
        if let Some(ct) = self.content_type {
            request = request.with_declared_content_type(ct);
        }
        if let Some(title) = self.title.filter(|t| !t.trim().is_empty()).or(self.file_name) {
            request = request.with_title(title);
        }
        request
    }
}

fn multipart_error(err: MultipartError) -> VinylAxumError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VinylError::payload_too_large(err.body_text()).into()
    } else {
        VinylError::bad_request(err.body_text()).into()
    }
}

impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = VinylAxumError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| VinylAxumError::from(VinylError::bad_request(e.body_text())))?;

        let mut file = None;
        let mut file_name = None;
        let mut content_type = None;
        let mut title = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            match field.name() {
                Some("file") => {
                    file_name = field.file_name().map(str::to_string);
                    content_type = field.content_type().map(str::to_string);
                    file = Some(field.bytes().await.map_err(multipart_error)?);
                }
                Some("title") => {
                    title = Some(field.text().await.map_err(multipart_error)?);
                }
                _ => {}
            }
        }

        let file = file.ok_or_else(|| {
            VinylAxumError::from(VinylError::bad_request("multipart field `file` is required"))
        })?;

        Ok(Self {
            file,
            file_name,
            content_type,
            title,
        })
    }
}
