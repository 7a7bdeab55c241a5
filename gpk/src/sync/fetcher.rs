//! HTTP fetch capability

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::error::FetchError;

/// Ceiling on any single response body
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// GET the bytes behind a URL
///
/// Implementations bound the request time and the response size. The engine
/// never retries within a cycle.
#[async_trait]
pub trait PackFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        debug!(?timeout, %max_bytes, "HttpFetcher::new: called");
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gamepacks/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl PackFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(%url, "HttpFetcher::fetch: called");
        if !url.starts_with("http://") && !url.starts_with("https://") {
            debug!("HttpFetcher::fetch: invalid URL protocol");
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let mut response = self.client.get(url).send().await.map_err(network)?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "HttpFetcher::fetch: HTTP error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };

        if let Some(len) = response.content_length()
            && len > self.max_bytes as u64
        {
            debug!(%len, "HttpFetcher::fetch: declared length over limit");
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(network)? {
            if body.len() + chunk.len() > self.max_bytes {
                debug!("HttpFetcher::fetch: body over limit");
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        debug!(body_len = body.len(), "HttpFetcher::fetch: complete");
        Ok(body)
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory fetcher for unit tests
    #[derive(Default)]
    pub struct MockFetcher {
        responses: Mutex<HashMap<String, Result<Vec<u8>, u16>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok(body.into()));
        }

        pub fn fail(&self, url: &str, status: u16) {
            self.responses.lock().unwrap().insert(url.to_string(), Err(status));
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn reset_calls(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl PackFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            debug!(%url, "MockFetcher::fetch: called");
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.lock().unwrap().get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_mock_fetcher_records_calls() {
        let fetcher = MockFetcher::new();
        fetcher.set("https://x/a", b"hello".to_vec());
        fetcher.fail("https://x/b", 500);

        assert_eq!(fetcher.fetch("https://x/a").await.unwrap(), b"hello");
        assert!(matches!(
            fetcher.fetch("https://x/b").await,
            Err(FetchError::Status { status: 500, .. })
        ));
        assert!(matches!(
            fetcher.fetch("https://x/c").await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert_eq!(fetcher.call_count(), 3);
    }
}
