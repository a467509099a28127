//! Webhook export sink
//!
//! POSTs the export payload as JSON to an automation workflow URL.
//! Any 2xx response counts as acceptance; a JSON body with a `reference`,
//! `id` or `executionId` field is surfaced as the sink reference.

use async_trait::async_trait;
use reel_core::{ExportAck, ExportError, ExportPayload, ExportSink, StudioConfig};
use std::time::Duration;

/// Export sink posting to a webhook
#[derive(Debug, Clone)]
pub struct WebhookExportSink {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookExportSink {
    /// Create sink for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create sink from configuration, if a webhook is configured
    pub fn from_config(config: &StudioConfig) -> Option<Self> {
        config
            .export_webhook_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|u| Self::new(u).with_timeout(config.request_timeout()))
    }

    /// With request deadline
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Target URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn reference_from(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["reference", "id", "executionId"].iter().find_map(|key| match &value[*key] {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[async_trait]
impl ExportSink for WebhookExportSink {
    async fn export(&self, payload: ExportPayload) -> Result<ExportAck, ExportError> {
        tracing::info!(url = %self.url, project = %payload.project_id, frames = payload.frames.len(), "posting export");
        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ExportError::Rejected(format!("status {}: {body}", status.as_u16())));
        }
        Ok(ExportAck {
            accepted: true,
            reference: reference_from(&body),
        })
    }
}
