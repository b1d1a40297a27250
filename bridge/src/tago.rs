use crate::errors::Result;
use crate::metrics::FETCH_FAILURES_TOTAL;
use crate::model::{RawMessage, TagoResponse};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Client for the TagoIO device data endpoint.
pub struct TagoClient {
    http: Client,
    base_url: String,
    token: String,
}

impl TagoClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(TagoClient {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// Fetches up to `limit` of the most recent messages.
    ///
    /// Transport and parse errors are logged and yield an empty batch,
    /// indistinguishable from "no new data" at the call site; the fetch
    /// failure counter is the only signal telling the two apart.
    pub async fn fetch_batch(&self, limit: usize) -> Vec<RawMessage> {
        match self.try_fetch(limit).await {
            Ok(batch) => {
                debug!("fetched {} messages", batch.len());
                batch
            }
            Err(e) => {
                warn!("telemetry fetch failed: {}", e);
                FETCH_FAILURES_TOTAL.inc();
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, limit: usize) -> Result<Vec<RawMessage>> {
        let url = format!("{}/data", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Device-Token", &self.token)
            .query(&[("qty", limit)])
            .send()
            .await?
            .error_for_status()?;

        let envelope: TagoResponse = response.json().await?;
        if !envelope.status {
            return Ok(Vec::new());
        }
        Ok(envelope.result)
    }
}
