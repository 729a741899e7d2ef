//! RangeStreamer: serves an object's plaintext as a full (200) or partial
//! (206) response.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use vinyl_blob::{ByteRange, RangeError, RangeWindow};

pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// How a response body should be presented by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

#[derive(Debug, Clone, Copy)]
pub struct RangeStreamer {
    chunk_size: usize,
}

impl Default for RangeStreamer {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl RangeStreamer {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Picks the serving window for `total_len` bytes.
    ///
    /// `Ok(None)` means the full object: either no `Range` header was sent
    /// or it did not parse.
    pub fn window(&self, range: Option<&str>, total_len: u64) -> Result<Option<RangeWindow>, RangeError> {
        match range.and_then(ByteRange::parse) {
            Some(range) => range.resolve(total_len).map(Some),
            None => Ok(None),
        }
    }

    /// Builds the response for `bytes`, honouring the request's `Range` header.
    pub fn serve(
        &self,
        request_headers: &HeaderMap,
        bytes: Bytes,
        content_type: &str,
        disposition: Disposition,
    ) -> Result<Response, RangeError> {
        let range = request_headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok());
        let total_len = bytes.len() as u64;

        let (status, body_bytes, content_range) = match self.window(range, total_len)? {
            Some(window) => {
                tracing::debug!(range = %window.content_range(), "serving partial content");
                (
                    StatusCode::PARTIAL_CONTENT,
                    bytes.slice(window.as_slice_bounds()),
                    Some(window.content_range()),
                )
            }
            None => (StatusCode::OK, bytes, None),
        };

        let mut response = (status, self.body(body_bytes.clone())).into_response();
        let headers = response.headers_mut();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body_bytes.len() as u64));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
        );
        if let Some(value) = content_range.and_then(|v| HeaderValue::from_str(&v).ok()) {
            headers.insert(header::CONTENT_RANGE, value);
        }
        if disposition == Disposition::Attachment {
            headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("attachment"));
        }
        Ok(response)
    }

    /// Streams `bytes` in fixed-size chunks. Dropping the body (client gone)
    /// stops the stream and releases the buffer.
    fn body(&self, bytes: Bytes) -> Body {
        let chunk_size = self.chunk_size;
        let stream = async_stream::stream! {
            let mut offset = 0;
            while offset < bytes.len() {
                let end = (offset + chunk_size).min(bytes.len());
                yield Ok::<Bytes, std::io::Error>(bytes.slice(offset..end));
                offset = end;
            }
        };
        Body::from_stream(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn source(len: usize) -> Bytes {
        Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
    }

    fn with_range(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn chunks(response: Response) -> Vec<Bytes> {
        let mut stream = response.into_body().into_data_stream();
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.push(chunk.unwrap());
        }
        out
    }

    #[test]
    fn malformed_ranges_mean_full_content() {
        let streamer = RangeStreamer::default();
        assert_eq!(streamer.window(Some("bytes=abc-"), 10), Ok(None));
        assert_eq!(streamer.window(Some("items=0-1"), 10), Ok(None));
        assert_eq!(streamer.window(None, 10), Ok(None));
        assert!(streamer.window(Some("bytes=10-"), 10).is_err());
    }

    #[tokio::test]
    async fn partial_body_is_chunked_and_exact() {
        let data = source(20_000);
        let streamer = RangeStreamer::default();
        let response = streamer
            .serve(&with_range("bytes=100-10099"), data.clone(), "audio/mpeg", Disposition::Inline)
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10000");
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 100-10099/20000");

        let chunks = chunks(response).await;
        assert!(chunks.iter().all(|c| c.len() <= DEFAULT_CHUNK_SIZE));
        assert_eq!(chunks.len(), 3);
        let joined: Vec<u8> = chunks.concat();
        assert_eq!(&joined[..], &data[100..10_100]);
    }

    #[tokio::test]
    async fn attachment_disposition_is_set() {
        let response = RangeStreamer::new(8)
            .serve(&HeaderMap::new(), source(20), "audio/ogg", Disposition::Attachment)
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_DISPOSITION], "attachment");
        assert_eq!(chunks(response).await.len(), 3);
    }
}
