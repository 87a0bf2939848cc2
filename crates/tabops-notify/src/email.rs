//! SMTP email notifier

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use tabops_core::{NotificationError, Notifier};

use crate::error::{NotifyError, Result};

/// SMTP relay and addressing
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub port: u16,
    /// Sender address, also the SMTP login
    pub mail_from: String,
    pub password: String,
    /// Comma separated recipient list
    pub mail_to: String,
    pub subject_prefix: String,
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| NotifyError::InvalidAddress {
            address: address.trim().to_string(),
            reason: e.to_string(),
        })
}

/// Sends HTML mail through a STARTTLS relay
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject_prefix: String,
}

impl EmailNotifier {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        if settings.smtp_server.trim().is_empty() {
            return Err(NotifyError::NotConfigured("smtp_server is empty".to_string()));
        }
        let to = settings
            .mail_to
            .split(',')
            .filter(|a| !a.trim().is_empty())
            .map(mailbox)
            .collect::<Result<Vec<_>>>()?;
        if to.is_empty() {
            return Err(NotifyError::NotConfigured("no recipients in mail_to".to_string()));
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_server)?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.mail_from.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: mailbox(&settings.mail_from)?,
            to,
            subject_prefix: settings.subject_prefix.trim().to_string(),
        })
    }

    fn subject(&self, subject: &str) -> String {
        if self.subject_prefix.is_empty() || subject.starts_with(&self.subject_prefix) {
            subject.to_string()
        } else {
            format!("[{}] {subject}", self.subject_prefix)
        }
    }

    /// Compose the message without sending it
    pub fn message(&self, subject: &str, body_html: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject(subject))
            .header(ContentType::TEXT_HTML);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        Ok(builder.body(body_html.to_string())?)
    }

    async fn send(&self, subject: &str, body_html: &str) -> Result<()> {
        let message = self.message(subject, body_html)?;
        self.transport.send(message).await?;
        info!(subject, recipients = self.to.len(), "Email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, subject: &str, body_html: &str) -> std::result::Result<(), NotificationError> {
        self.send(subject, body_html).await.map_err(Into::into)
    }
}
