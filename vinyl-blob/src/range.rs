//! Byte range arithmetic for partial content.
//!
//! Only the single-range forms `bytes=N-M` and `bytes=N-` are recognised.
//! Anything else parses to `None` and the caller serves the full object.

use thiserror::Error;
use vinyl_core::VinylError;

/// Requested range before it is checked against the object length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>, // None means "to end of object"
}

impl ByteRange {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    pub fn from_start(start: u64) -> Self {
        Self { start, end: None }
    }

    /// Parses a `Range` header value.
    pub fn parse(header: &str) -> Option<Self> {
        let spec = header.trim().strip_prefix("bytes=")?;
        let (start, end) = spec.split_once('-')?;

        let start = parse_digits(start)?;
        let end = if end.is_empty() {
            None
        } else {
            Some(parse_digits(end)?)
        };
        Some(Self { start, end })
    }

    /// Clamps against `total_len`; fails when nothing can be served.
    pub fn resolve(&self, total_len: u64) -> Result<RangeWindow, RangeError> {
        if total_len == 0 || self.start >= total_len {
            return Err(RangeError::Unsatisfiable { total_len });
        }
        let last = total_len - 1;
        let end = self.end.unwrap_or(last).min(last);
        if self.start > end {
            return Err(RangeError::Unsatisfiable { total_len });
        }
        Ok(RangeWindow {
            start: self.start,
            end_inclusive: end,
            total_len,
        })
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Inclusive window `[start, end_inclusive]` of an object of `total_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    pub start: u64,
    pub end_inclusive: u64,
    pub total_len: u64,
}

impl RangeWindow {
    /// Window covering the whole object, if it has any bytes.
    pub fn full(total_len: u64) -> Option<Self> {
        (total_len > 0).then(|| Self {
            start: 0,
            end_inclusive: total_len - 1,
            total_len,
        })
    }

    pub fn content_length(&self) -> u64 {
        self.end_inclusive - self.start + 1
    }

    pub fn is_full_content(&self) -> bool {
        self.start == 0 && self.end_inclusive + 1 == self.total_len
    }

    /// `bytes <start>-<end>/<total>`
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end_inclusive, self.total_len)
    }

    /// Index bounds for slicing the source buffer.
    pub fn as_slice_bounds(&self) -> std::ops::Range<usize> {
        self.start as usize..(self.end_inclusive + 1) as usize
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    #[error("Requested range not satisfiable for {total_len} bytes")]
    Unsatisfiable { total_len: u64 },
}

impl RangeError {
    /// `Content-Range` value sent with a 416.
    pub fn content_range(&self) -> String {
        match self {
            RangeError::Unsatisfiable { total_len } => format!("bytes */{total_len}"),
        }
    }
}

impl From<RangeError> for VinylError {
    fn from(err: RangeError) -> Self {
        VinylError::range_not_satisfiable(err.to_string())
            .with_data(serde_json::json!({ "contentRange": err.content_range() }))
    }
}
