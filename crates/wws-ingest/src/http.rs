//! Blocking HTTP transport for Workday Web Services.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::paging::PageFetcher;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(8000);

/// Posts SOAP payloads to a single endpoint.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, payload: &str) -> Result<Vec<u8>> {
        debug!(url = %self.url, bytes = payload.len(), "posting request");
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/xml")
            .body(payload.to_string())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "unreadable response body".to_string());
            return Err(IngestError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                message: message.chars().take(2000).collect(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}
