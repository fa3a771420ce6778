//! Notification sinks.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{info, warn};

use warden_core::config::SinkConfig;

use crate::event::{AlertEvent, AlertStatus, Severity};

/// A destination for alert events.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, event: &AlertEvent) -> anyhow::Result<()>;
}

/// Writes alerts to the log.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, event: &AlertEvent) -> anyhow::Result<()> {
        match (event.status, event.severity) {
            (AlertStatus::Resolved, _) | (_, Severity::Info) => {
                info!(rule = %event.rule, service = %event.service, "{}", event.summary())
            }
            _ => warn!(rule = %event.rule, service = %event.service, severity = %event.severity, "{}", event.summary()),
        }
        Ok(())
    }
}

/// POSTs the event as JSON.
pub struct WebhookSink {
    name: String,
    url: String,
    client: Client,
}

impl WebhookSink {
    pub fn new(url: &str, headers: &HashMap<String, String>) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .with_context(|| format!("invalid webhook header name {key:?}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for webhook header {key:?}"))?;
            default_headers.insert(name, value);
        }
        let client = Client::builder()
            .user_agent("warden-alert/0.1")
            .default_headers(default_headers)
            .build()
            .context("building webhook client")?;
        Ok(Self {
            name: format!("webhook {url}"),
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, event: &AlertEvent) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// POSTs `{"text": summary}` to an incoming chat webhook.
pub struct ChatSink {
    name: String,
    url: String,
    client: Client,
}

impl ChatSink {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("warden-alert/0.1")
            .build()
            .context("building chat client")?;
        Ok(Self {
            name: format!("chat {url}"),
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl AlertSink for ChatSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, event: &AlertEvent) -> anyhow::Result<()> {
        let payload = serde_json::json!({ "text": event.summary() });
        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Instantiate the configured sinks in order.
pub fn build_sinks(configs: &[SinkConfig]) -> anyhow::Result<Vec<Arc<dyn AlertSink>>> {
    configs
        .iter()
        .map(|config| {
            let sink: Arc<dyn AlertSink> = match config {
                SinkConfig::Log => Arc::new(LogSink),
                SinkConfig::Webhook { url, headers } => Arc::new(WebhookSink::new(url, headers)?),
                SinkConfig::Chat { url } => Arc::new(ChatSink::new(url)?),
            };
            Ok::<_, anyhow::Error>(sink)
        })
        .collect()
}
