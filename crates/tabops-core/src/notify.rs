//! Notification seam
//!
//! Delivery (SMTP, Slack) lives outside the core. A failed notification must
//! never fail the operation that triggered it, so call sites go through
//! [`notify_best_effort`].

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

/// Email or Slack delivery failure
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notifier is not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Sends a subject plus HTML body to some audience
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body_html: &str) -> Result<(), NotificationError>;
}

/// Notifier that drops every message; used when alerting is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, subject: &str, _body_html: &str) -> Result<(), NotificationError> {
        info!(subject, "Notifications disabled, dropping message");
        Ok(())
    }
}

/// Send and swallow any delivery failure
pub async fn notify_best_effort(notifier: &dyn Notifier, subject: &str, body_html: &str) {
    if let Err(e) = notifier.notify(subject, body_html).await {
        error!(subject, "Notification failed: {e}");
    }
}

/// Escape text interpolated into HTML bodies
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RecordingNotifier;

    #[tokio::test]
    async fn test_best_effort_swallows_failures() {
        let notifier = RecordingNotifier::failing();
        notify_best_effort(&notifier, "subject", "<p>body</p>").await;
        assert_eq!(notifier.subjects(), vec!["subject".to_string()]);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
