//! HTTP transport for review files hosted remotely.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

/// Downloads one dataset body. Non-2xx statuses are errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn download(&self, url: &Url) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestClient(reqwest::Client);

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        let body = self
            .0
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()?
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?;

        debug!(%url, bytes = body.len(), "Dataset downloaded");
        Ok(body.to_vec())
    }
}

/// Parses `url` and downloads it through `client`.
pub async fn fetch_dataset<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let url = Url::parse(url).with_context(|| format!("invalid dataset URL {url}"))?;
    client.download(&url).await
}
