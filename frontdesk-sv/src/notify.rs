//! Outbound notification sinks
//!
//! A pluggable capability with two operations: tell a supervisor a new help
//! request exists, and tell an operator channel a customer message went out
//! (or could not go out live). The implementation is selected at construction
//! from configuration: a webhook URL yields `WebhookSink`, otherwise
//! everything goes to local logging via `LogSink`. Sink failures are absorbed
//! here; they never propagate into the escalation or delivery paths.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::HelpRequest;

/// Structured payload pushed through a sink
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A new help request needs a human answer
    SupervisorNotification { request: HelpRequest },
    /// A message for a customer (delivered live or queued for follow-up)
    #[serde(rename_all = "camelCase")]
    CustomerNotification {
        customer_phone: String,
        message: String,
    },
}

/// Outbound notification capability
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Notify the human channel that a request is waiting
    async fn notify_supervisor(&self, request: &HelpRequest);

    /// Surface a customer-bound message to the operator channel
    async fn notify_customer(&self, customer_phone: &str, message: &str);
}

/// Default sink: structured local logging
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify_supervisor(&self, request: &HelpRequest) {
        tracing::info!(
            request_id = %request.id,
            customer_phone = %request.customer_phone,
            question = %request.question,
            "Supervisor notification: help request needs an answer"
        );
    }

    async fn notify_customer(&self, customer_phone: &str, message: &str) {
        tracing::info!(
            customer_phone = %customer_phone,
            message = %message,
            "Customer notification"
        );
    }
}

/// Webhook sink: POSTs the structured payload to an operator endpoint,
/// falling back to local logging when delivery fails
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    fallback: LogSink,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
            fallback: LogSink,
        }
    }

    async fn post(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        let response = self.client.post(&self.url).json(event).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("webhook returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify_supervisor(&self, request: &HelpRequest) {
        let event = NotificationEvent::SupervisorNotification {
            request: request.clone(),
        };
        if let Err(e) = self.post(&event).await {
            tracing::warn!("Webhook delivery failed ({}), falling back to log", e);
            self.fallback.notify_supervisor(request).await;
        }
    }

    async fn notify_customer(&self, customer_phone: &str, message: &str) {
        let event = NotificationEvent::CustomerNotification {
            customer_phone: customer_phone.to_string(),
            message: message.to_string(),
        };
        if let Err(e) = self.post(&event).await {
            tracing::warn!("Webhook delivery failed ({}), falling back to log", e);
            self.fallback.notify_customer(customer_phone, message).await;
        }
    }
}

/// Select a sink from configuration
pub fn sink_from_config(webhook_url: Option<&str>) -> Arc<dyn NotificationSink> {
    match webhook_url {
        Some(url) => {
            tracing::info!("Notifications: webhook sink ({})", url);
            Arc::new(WebhookSink::new(url))
        }
        None => {
            tracing::info!("Notifications: local logging sink");
            Arc::new(LogSink)
        }
    }
}
