use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: Url,
    pub timeout: Duration,
}

/// The external PO classification call. Returns the collaborator's raw text,
/// which is expected but not guaranteed to be JSON.
#[async_trait]
pub trait PoClassifier: Send + Sync {
    async fn classify_po(&self, description: &str, supplier: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ClassifyPayload<'a> {
    description: &'a str,
    supplier: &'a str,
}

/// Posts `{"description", "supplier"}` to the configured endpoint and hands
/// back the response body untouched.
#[derive(Debug, Clone)]
pub struct HttpPoClassifier {
    client: Client,
    endpoint: Url,
}

impl HttpPoClassifier {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .context("failed to build classifier http client")?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PoClassifier for HttpPoClassifier {
    async fn classify_po(&self, description: &str, supplier: &str) -> Result<String> {
        debug!(endpoint = %self.endpoint, "calling classifier");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ClassifyPayload {
                description,
                supplier,
            })
            .send()
            .await
            .with_context(|| format!("classifier request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, endpoint = %self.endpoint, "classifier returned error status");
            anyhow::bail!("classifier responded with status {status}");
        }

        response
            .text()
            .await
            .context("failed to read classifier response body")
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
