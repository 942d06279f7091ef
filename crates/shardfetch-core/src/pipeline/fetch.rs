//! Remote byte fetching.
//!
//! Workers only see the [`Fetcher`] trait, so tests and alternative transports
//! can stand in for HTTP.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ItemError, ItemResult, ShardfetchError};

/// Fetches the full body behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Return the complete response body or a `ItemError::Fetch`.
    async fn fetch(&self, url: &str) -> ItemResult<Vec<u8>>;
}

/// `reqwest`-backed fetcher with an idle-read timeout and body size cap.
///
/// The timeout bounds each wait on the network (response headers, then every
/// body chunk), not the whole transfer, so a large image that keeps arriving
/// is never cut off.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    read_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, max_bytes: u64, read_timeout: Duration) -> Self {
        Self {
            client,
            max_bytes,
            read_timeout,
        }
    }

    /// Build a client from `http` and `limits` settings.
    pub fn from_config(config: &Config) -> Result<Self, ShardfetchError> {
        let user_agent = config
            .http
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("shardfetch/{}", crate::VERSION));
        let client = reqwest::Client::builder()
            .connect_timeout(config.http.timeout())
            .user_agent(user_agent)
            .build()
            .map_err(|e| ShardfetchError::Client(e.to_string()))?;
        Ok(Self::new(
            client,
            config.limits.max_download_bytes(),
            config.http.timeout(),
        ))
    }

    fn fail(url: &str, message: impl Into<String>) -> ItemError {
        ItemError::Fetch {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> ItemResult<Vec<u8>> {
        let response = tokio::time::timeout(self.read_timeout, self.client.get(url).send())
            .await
            .map_err(|_| Self::fail(url, format!("no response within {:?}", self.read_timeout)))?
            .map_err(|e| Self::fail(url, e.to_string()))?
            .error_for_status()
            .map_err(|e| Self::fail(url, e.to_string()))?;

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(Self::fail(
                    url,
                    format!("body of {len} bytes exceeds limit of {}", self.max_bytes),
                ));
            }
        }

        let mut body = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::time::timeout(self.read_timeout, stream.next())
                .await
                .map_err(|_| {
                    Self::fail(url, format!("read stalled for {:?}", self.read_timeout))
                })?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| Self::fail(url, e.to_string()))?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(Self::fail(
                    url,
                    format!("body exceeds limit of {} bytes", self.max_bytes),
                ));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}
