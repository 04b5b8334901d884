//! S3-compatible storage backend.
//!
//! Covers AWS S3 and the S3-compatible APIs most CDN-fronted object stores
//! expose (Aliyun OSS, Backblaze B2, Tigris, MinIO, ...).
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.

use crate::{
    PutObject, StorageBackend,
    error::{Error, ErrorKind, Result},
    validate_key,
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::DisplayErrorContext,
    primitives::{ByteStream, DateTime},
};
use exn::ResultExt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Upper bound on in-flight S3 requests from one backend. The publisher caps
/// its own concurrency well below this.
const DEFAULT_CONCURRENT_REQUESTS: usize = 32;

/// S3-compatible storage backend.
///
/// Stores objects in a bucket, optionally under a key prefix.
///
/// # Examples
///
/// ```no_run
/// use ferry_storage::backend::S3Backend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "oss",
///     "my-bucket",
///     None,
///     "oss-cn-hangzhou",
///     Some("https://oss-cn-hangzhou.aliyuncs.com"),
///     "access_key_id",
///     "secret_access_key",
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - Bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - Provider-specific region
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.as_deref().map(validate_key).transpose()?;
        let credentials = Credentials::new(key_id, key_secret, None, None, "ferry-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // 1 initial + 3 retries, exponential backoff
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            prefix,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Construct the full S3 key from a relative key.
    fn full_key(&self, key: &str) -> Result<String> {
        Ok(join_prefix(self.prefix.as_deref(), &validate_key(key)?))
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("S3 rate limiter closed".to_string()))
    }

    fn network_error(&self, operation: &str, key: &str, err: impl std::error::Error) -> Error {
        exn::Exn::from(ErrorKind::Network(format!(
            "{operation} {key} on {}: {}",
            self.name,
            DisplayErrorContext(&err)
        )))
    }
}

fn join_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, object), fields(bucket = %self.bucket, key = %object.key, size = object.body.len()))]
    async fn put(&self, object: PutObject) -> Result<()> {
        let full_key = self.full_key(&object.key)?;
        let _permit = self.acquire_permit().await?;
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(object.body))
            .content_type(object.content_type)
            .set_content_encoding(object.encoding.header_value().map(str::to_string))
            .set_cache_control(object.cache_control)
            .set_expires(object.expires.map(|t| DateTime::from_secs(t.unix_timestamp())))
            .send()
            .await;
        match result {
            Ok(_) => {
                tracing::debug!("object stored");
                Ok(())
            },
            Err(err) => Err(self.network_error("PUT", &full_key, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_key_without_prefix() {
        assert_eq!(join_prefix(None, "0123abcd/app.js"), "0123abcd/app.js");
    }

    #[test]
    fn test_full_key_with_trailing_slash_prefix() {
        assert_eq!(join_prefix(Some("static/"), "0123abcd/app.js"), "static/0123abcd/app.js");
    }

    #[test]
    fn test_constructor_rejects_escaping_prefix() {
        let result = S3Backend::new("s3", "bucket", Some("../up".to_string()), "us-east-1", None::<String>, "id", "secret");
        assert!(result.is_err());
    }
}
