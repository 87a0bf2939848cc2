// Builds application state from configuration

use std::sync::Arc;

use tabops_api::AppState;
use tabops_config::{AppConfig, EmailConfig, ServerConfig, SlackConfig};
use tabops_core::{DisabledNotifier, Notifier, SessionProvider};
use tabops_http::HttpClient;
use tabops_notify::{EmailNotifier, EmailSettings, FanoutNotifier, SlackNotifier, SlackSettings};
use tabops_rest::{RestSettings, TableauSessionProvider};
use tracing::{debug, info};

use crate::error::CliResult;

pub fn rest_settings(server: &ServerConfig) -> RestSettings {
    RestSettings {
        server_url: server.url.clone(),
        api_version: server.api_version.clone(),
        token_name: server.token_name.clone(),
        token_secret: server.token_secret.clone(),
        page_size: server.page_size,
    }
}

pub fn email_settings(email: &EmailConfig) -> EmailSettings {
    EmailSettings {
        smtp_server: email.smtp_server.clone(),
        port: email.port,
        mail_from: email.mail_from.clone(),
        password: email.password.clone(),
        mail_to: email.mail_to.clone(),
        subject_prefix: email.subject_prefix.clone(),
    }
}

/// Slack notifier, if either delivery route is configured
pub fn slack_notifier(http: &HttpClient, slack: &SlackConfig) -> Option<Arc<dyn Notifier>> {
    if !slack.is_configured() {
        return None;
    }
    let settings = SlackSettings {
        webhook_url: slack.webhook_url.clone().filter(|u| !u.trim().is_empty()),
        bot_token: slack.bot_token.clone().filter(|t| !t.trim().is_empty()),
        channel: slack.channel.clone(),
    };
    Some(Arc::new(SlackNotifier::new(http.clone(), settings)))
}

/// Audit and Pulse alerts go to email and, when configured, Slack
pub fn alert_notifier(config: &AppConfig, slack: Option<Arc<dyn Notifier>>) -> CliResult<Arc<dyn Notifier>> {
    let mut fanout = FanoutNotifier::default();
    if config.email.enabled {
        fanout.push(Arc::new(EmailNotifier::new(&email_settings(&config.email))?));
    }
    if let Some(slack) = slack {
        fanout.push(slack);
    }

    if fanout.is_empty() {
        info!("No alert channel configured, alerts will only be logged");
        return Ok(Arc::new(DisabledNotifier));
    }
    Ok(Arc::new(fanout))
}

/// Wire the REST session provider and notifiers into the API state
pub fn build_state(config: AppConfig) -> CliResult<AppState> {
    let http = HttpClient::new(config.http.clone())?;
    let sessions: Arc<dyn SessionProvider> = Arc::new(TableauSessionProvider::new(
        http.clone(),
        rest_settings(&config.server),
    ));

    let slack = slack_notifier(&http, &config.slack);
    let alerts = alert_notifier(&config, slack.clone())?;
    let chat: Arc<dyn Notifier> = match slack {
        Some(slack) => slack,
        None => Arc::new(DisabledNotifier),
    };

    debug!(server = %config.server.url, site = %config.server.site_id, "Application state ready");
    Ok(AppState::new(config, sessions, alerts, chat))
}
