//! Notifier error types

use tabops_core::NotificationError;
use tabops_http::HttpError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier is not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Slack answered but refused the message
    #[error("Slack rejected message: {0}")]
    Rejected(String),
}

impl From<NotifyError> for NotificationError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::NotConfigured(what) => NotificationError::NotConfigured(what),
            NotifyError::InvalidAddress { .. } | NotifyError::Message(_) => {
                NotificationError::InvalidMessage(err.to_string())
            }
            other => NotificationError::Delivery(other.to_string()),
        }
    }
}
