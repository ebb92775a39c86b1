//! Remote data source abstraction and its HTTP implementation.

use std::time::Duration;

/// Errors from fetching a URL.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status code
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// A mock source had nothing registered for the URL
    #[error("no mock response for {0}")]
    Unmocked(String),
}

/// Anything that can turn a URL into a payload.
///
/// The cache consults this on a miss. URLs come from [`super::Endpoints`] and
/// are passed through opaquely.
pub trait RemoteSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Remote source backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    http: reqwest::Client,
}

impl HttpSource {
    /// Create a new HTTP source with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl RemoteSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
