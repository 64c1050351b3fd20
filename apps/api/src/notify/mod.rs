//! Outbound notifications for newly filed complaints.
//!
//! Delivery is best-effort: [`dispatch`] detaches the send onto the runtime
//! and only logs the outcome.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::complaint::Complaint;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail API returned status {status}: {message}")]
    Api { status: u16, message: String },
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Renders the "new complaint" message sent to the support inbox.
pub fn render_new_complaint(complaint: &Complaint, recipient: &str) -> Notification {
    let submitter = complaint.user_email.as_deref().unwrap_or("Guest");
    let body = format!(
        "A new complaint has been submitted.\n\n\
         Complaint ID: {id}\n\
         Submitted by: {submitter}\n\
         Category: {category}\n\
         Sentiment: {sentiment}\n\
         Priority: {priority}\n\
         Confidence: {confidence}%\n\n\
         Complaint:\n{text}\n\n\
         Suggested response:\n{response}\n",
        id = complaint.id,
        category = complaint.category,
        sentiment = complaint.sentiment,
        priority = complaint.priority,
        confidence = complaint.ai_confidence_score,
        text = complaint.complaint_text,
        response = complaint.ai_response,
    );

    Notification {
        recipient: recipient.to_string(),
        subject: format!(
            "[{}] New complaint: {}",
            complaint.priority, complaint.category
        ),
        body,
    }
}

/// Sends `notification` on a detached task. Failures are logged and dropped.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        match notifier.send(&notification).await {
            Ok(()) => info!("Notification sent to {}", notification.recipient),
            Err(e) => warn!(
                "Failed to send notification to {}: {e}",
                notification.recipient
            ),
        }
    });
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Posts notifications to a transactional mail API.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    url: String,
    api_key: Option<String>,
    sender: String,
}

impl HttpNotifier {
    pub fn new(url: String, api_key: Option<String>, sender: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to build notification HTTP client")?;
        Ok(Self {
            client,
            url,
            api_key,
            sender,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let body = MailRequest {
            from: &self.sender,
            to: [&notification.recipient],
            subject: &notification.subject,
            text: &notification.body,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Used when no mail API is configured: the notification is only logged.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            "Mail delivery not configured; would notify {}: {}",
            notification.recipient, notification.subject
        );
        Ok(())
    }
}
