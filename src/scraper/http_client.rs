use crate::config::ProviderConfig;
use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

pub struct HttpClient {
    inner: reqwest::Client,
    request_delay: Duration,
}

impl HttpClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            request_delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    /// GET a URL and decode the JSON body. One attempt only; the caller
    /// decides whether a failure is fatal.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        self.polite_delay().await;
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url.path()))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {} from {}", status, url.path());
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to decode response from {}", url.path()))
    }

    /// Fixed pause before each request; the quote API throttles bursts.
    async fn polite_delay(&self) {
        if !self.request_delay.is_zero() {
            sleep(self.request_delay).await;
        }
    }
}
