//! Storage models.

use ferry_compress::Encoding;
use time::{Duration, OffsetDateTime};

/// `Cache-Control` max-age for published assets: ten years.
///
/// Keys are content-addressed (or explicitly versioned by the user), so an
/// object at a given key never changes and can be cached indefinitely.
pub const IMMUTABLE_MAX_AGE_SECS: u64 = 315_360_000;

/// A single object upload.
///
/// The body is stored exactly as given: if [`encoding`](Self::encoding) is
/// not identity the caller has already encoded it, and the backend only
/// records the matching `Content-Encoding` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    /// Object key, relative to the backend root
    pub key: String,
    pub body: Vec<u8>,
    /// Full `Content-Type` header value, including any charset
    pub content_type: String,
    pub encoding: Encoding,
    pub cache_control: Option<String>,
    pub expires: Option<OffsetDateTime>,
}
impl PutObject {
    pub fn new(key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            body: body.into(),
            content_type: "application/octet-stream".to_string(),
            encoding: Encoding::Identity,
            cache_control: None,
            expires: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Mark the object as immutable: long `Cache-Control` max-age and an
    /// `Expires` ten years after `now`.
    pub fn immutable(mut self, now: OffsetDateTime) -> Self {
        self.cache_control = Some(format!("max-age={IMMUTABLE_MAX_AGE_SECS}"));
        self.expires = Some(now + Duration::seconds(IMMUTABLE_MAX_AGE_SECS as i64));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_defaults() {
        let object = PutObject::new("a/b.bin", vec![1, 2, 3]);
        assert_eq!(object.content_type, "application/octet-stream");
        assert_eq!(object.encoding, Encoding::Identity);
        assert!(object.cache_control.is_none());
        assert!(object.expires.is_none());
    }

    #[test]
    fn test_immutable_headers() {
        let now = datetime!(2024-01-01 0:00 UTC);
        let object = PutObject::new("k", b"v".to_vec()).immutable(now);
        assert_eq!(object.cache_control.as_deref(), Some("max-age=315360000"));
        assert_eq!(object.expires, Some(datetime!(2033-12-29 0:00 UTC)));
    }
}
