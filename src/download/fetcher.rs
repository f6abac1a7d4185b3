// file: src/download/fetcher.rs
// description: text retrieval from agency web services with retries
// reference: https://docs.rs/reqwest

use crate::config::DownloadConfig;
use crate::error::{DatastoreError, Result};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Source of raw reply text for a URL.
pub trait Fetcher: Sync {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

pub struct HttpFetcher {
    client: Client,
    max_attempts: usize,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        debug!("Requesting {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DatastoreError::Download(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DatastoreError::Download(format!(
                "Request failed with status {}: {}",
                status, error_text
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DatastoreError::Download(format!("Failed to read reply: {}", e)))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match self.fetch_once(url).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("Attempt {}/{} failed for {}: {}", attempt, self.max_attempts, url, e);
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| DatastoreError::Download(format!("No attempt made for {}", url))))
    }
}
