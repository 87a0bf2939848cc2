//! Slack notifier
//!
//! Posts through an incoming webhook when one is configured, otherwise
//! through `chat.postMessage` with a bot token. Slack renders its own
//! markup, so HTML bodies are reduced to plain text first.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use tabops_core::{NotificationError, Notifier};
use tabops_http::{HttpClient, Method};

use crate::error::{NotifyError, Result};

pub const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone, Default)]
pub struct SlackSettings {
    pub webhook_url: Option<String>,
    pub bot_token: Option<String>,
    pub channel: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackNotifier {
    http: HttpClient,
    settings: SlackSettings,
    api_base: String,
}

/// Drop tags and decode the entities our own bodies produce
fn plain_text(body: &str) -> String {
    if !body.contains('<') {
        return body.to_string();
    }
    let mut text = String::with_capacity(body.len());
    let mut in_tag = false;
    for c in body.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let text = text
        .replace("&darr;", "↓")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl SlackNotifier {
    pub fn new(http: HttpClient, settings: SlackSettings) -> Self {
        Self {
            http,
            settings,
            api_base: SLACK_API_BASE.to_string(),
        }
    }

    /// Point `chat.postMessage` at another host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn text(subject: &str, body: &str) -> String {
        let body = plain_text(body);
        if body.is_empty() {
            subject.to_string()
        } else if body.starts_with('*') {
            body
        } else {
            format!("*{subject}*\n{body}")
        }
    }

    async fn post(&self, text: String) -> Result<()> {
        if let Some(url) = self.settings.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            let request = self.http.request(Method::POST, url)?.json(&json!({ "text": text }));
            self.http.send(request).await?;
            info!("Slack webhook message sent");
            return Ok(());
        }

        let token = self
            .settings
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| NotifyError::NotConfigured("no Slack webhook URL or bot token".to_string()))?;
        let url = format!("{}/chat.postMessage", self.api_base.trim_end_matches('/'));
        let request = self
            .http
            .request(Method::POST, &url)?
            .bearer_auth(token)
            .json(&json!({ "channel": self.settings.channel, "text": text }));
        let response: PostMessageResponse = self
            .http
            .send(request)
            .await?
            .json()
            .await
            .map_err(tabops_http::HttpError::RequestFailed)?;
        if !response.ok {
            return Err(NotifyError::Rejected(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        info!(channel = %self.settings.channel, "Slack message posted");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, subject: &str, body_html: &str) -> std::result::Result<(), NotificationError> {
        self.post(Self::text(subject, body_html)).await.map_err(Into::into)
    }
}
