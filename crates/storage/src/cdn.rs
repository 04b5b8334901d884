//! CDN cache refresh.
//!
//! Objects published under a custom (user-chosen) key can be overwritten, so
//! the edge copies of their public URLs have to be purged after each upload.
//! Content-addressed keys never need this.

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CdnRefresher: Send + Sync {
    /// Purge the edge cache for one public URL.
    async fn refresh(&self, url: &str) -> Result<()>;
}

#[cfg(feature = "cdn")]
pub use self::http::HttpRefresher;
#[cfg(feature = "mock")]
pub use self::mock::MockRefresher;

#[cfg(feature = "cdn")]
mod http {
    use super::CdnRefresher;
    use crate::error::{ErrorKind, Result};
    use async_trait::async_trait;
    use exn::ResultExt;

    /// Purges URLs through an HTTP API: `POST {endpoint}` with a JSON body of
    /// `{"paths": [url]}`, authenticated by a bearer token.
    #[derive(Debug, Clone)]
    pub struct HttpRefresher {
        client: reqwest::Client,
        endpoint: String,
        token: String,
    }

    impl HttpRefresher {
        pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
            let client = reqwest::Client::builder()
                .user_agent(concat!("ferry/", env!("CARGO_PKG_VERSION")))
                .build()
                .or_raise(|| ErrorKind::BackendError("could not build CDN HTTP client".to_string()))?;
            Ok(Self { client, endpoint: endpoint.into(), token: token.into() })
        }
    }

    #[async_trait]
    impl CdnRefresher for HttpRefresher {
        #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
        async fn refresh(&self, url: &str) -> Result<()> {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .json(&serde_json::json!({ "paths": [url] }))
                .send()
                .await
                .or_raise(|| ErrorKind::Network(format!("CDN refresh request for {url} failed")))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                exn::bail!(ErrorKind::Network(format!("CDN refresh for {url} returned {status}: {body}")));
            }
            tracing::info!(url, "CDN cache refreshed");
            Ok(())
        }
    }
}

#[cfg(feature = "mock")]
mod mock {
    use super::CdnRefresher;
    use crate::error::{ErrorKind, Result};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Records every refreshed URL instead of calling out.
    #[derive(Debug, Default)]
    pub struct MockRefresher {
        refreshed: Mutex<Vec<String>>,
        fail: bool,
    }

    impl MockRefresher {
        /// A refresher whose every call fails.
        pub fn failing() -> Self {
            Self { refreshed: Mutex::default(), fail: true }
        }

        pub async fn refreshed(&self) -> Vec<String> {
            self.refreshed.lock().await.clone()
        }
    }

    #[async_trait]
    impl CdnRefresher for MockRefresher {
        async fn refresh(&self, url: &str) -> Result<()> {
            if self.fail {
                exn::bail!(ErrorKind::Network(format!("mock refresh failure for {url}")));
            }
            self.refreshed.lock().await.push(url.to_string());
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_records_urls() {
            let refresher = MockRefresher::default();
            refresher.refresh("https://cdn.example.com/app.js").await.unwrap();
            assert_eq!(refresher.refreshed().await, vec!["https://cdn.example.com/app.js".to_string()]);
            assert!(MockRefresher::failing().refresh("https://x").await.is_err());
        }
    }
}
