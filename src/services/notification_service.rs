use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::models::event::PipelineEvent;

/// Outbound channel for pipeline events. Implementations should return
/// quickly; the pipeline never waits on delivery.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &PipelineEvent) -> anyhow::Result<()>;
}

/// Posts each event as JSON to a webhook. Delivery runs on a spawned task.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
    target_url: String,
    secret: Option<String>,
}

impl WebhookDispatcher {
    pub fn new(target_url: String, secret: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            target_url,
            secret,
        })
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn dispatch(&self, event: &PipelineEvent) -> anyhow::Result<()> {
        let payload = json!({
            "event_type": event.event_type(),
            "payload": event,
        });
        let mut request = self.client.post(&self.target_url).json(&payload);
        if let Some(secret) = &self.secret {
            request = request.header("X-Webhook-Secret", secret);
        }
        let event_type = event.event_type();

        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(event_type, "notification delivered");
                }
                Ok(resp) => {
                    tracing::warn!(event_type, status = resp.status().as_u16(), "notification rejected");
                }
                Err(err) => {
                    tracing::warn!(event_type, error = %err, "notification delivery failed");
                }
            }
        });
        Ok(())
    }
}

/// Writes events to the log only. Used when no webhook is configured.
#[derive(Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, event: &PipelineEvent) -> anyhow::Result<()> {
        tracing::info!(event_type = event.event_type(), event = ?event, "pipeline event");
        Ok(())
    }
}

/// Wraps a dispatcher so that delivery problems never reach the caller.
#[derive(Clone)]
pub struct Notifier {
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl Notifier {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn emit(&self, event: PipelineEvent) {
        if let Err(err) = self.dispatcher.dispatch(&event).await {
            tracing::warn!(
                event_type = event.event_type(),
                error = ?err,
                "failed to dispatch pipeline event"
            );
        }
    }
}
