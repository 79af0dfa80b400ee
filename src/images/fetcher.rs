//! Image download over HTTP(S)

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors that can occur while downloading an image
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    Status(u16),
    #[error("Unsupported image: {0}")]
    Unsupported(String),
    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),
    #[error("Empty response body")]
    Empty,
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
}

/// Raw result of a successful download
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// `Content-Type` header, if the server sent one
    pub content_type: Option<String>,
}

impl FetchedImage {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// Downloads an image by URL; one attempt, no retries
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn download(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Request timeout
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Maximum response size (bytes)
    pub max_content_size: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("h2o/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_content_size: 10 * 1024 * 1024, // 10 MB
            max_redirects: 10,
        }
    }
}

/// reqwest-backed [`ImageFetcher`]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpImageFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn download(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(len) = response.content_length() {
            if len as usize > self.config.max_content_size {
                return Err(FetchError::ContentTooLarge(len as usize));
            }
        }

        let bytes = response.bytes().await?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
