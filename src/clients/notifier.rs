//! Notification sink collaborator
//!
//! Best-effort operational alerts (human takeover, new dispatches). Failures
//! are logged and dropped; nothing in the pipeline waits on this.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::CollaboratorError;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), CollaboratorError>;
}

/// HTTP sink posting alerts as JSON to a configured webhook URL.
pub struct HttpNotifier {
    http: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        Self { http, url }
    }
}

#[derive(Serialize)]
struct Alert<'a> {
    subject: &'a str,
    body: &'a str,
}

#[async_trait]
impl NotificationSink for HttpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), CollaboratorError> {
        let response = self
            .http
            .post(&self.url)
            .json(&Alert { subject, body })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::UnexpectedStatus {
                service: "notifier",
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

/// Sink used when no alert URL is configured.
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, subject: &str, _body: &str) -> Result<(), CollaboratorError> {
        debug!(subject = %subject, "Notification sink not configured; dropping alert");
        Ok(())
    }
}
