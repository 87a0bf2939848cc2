//! Core configuration types and data structures

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tabops_http::HttpConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Tableau server connection and credentials
    pub server: ServerConfig,
    /// Download and snapshot directories
    pub storage: StorageConfig,
    /// SMTP alerting
    pub email: EmailConfig,
    /// Slack reporting
    pub slack: SlackConfig,
    /// Outbound HTTP client settings
    pub http: HttpConfig,
    /// HTTP API listener
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub pulse: PulseConfig,
}

/// Server URL, default site and personal access token
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    /// Site content URL used when a request does not name one
    pub site_id: String,
    pub token_name: String,
    pub token_secret: String,
    pub api_version: String,
    /// Page size for list calls
    pub page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            site_id: String::new(),
            token_name: String::new(),
            token_secret: String::new(),
            api_version: "3.22".to_string(),
            page_size: 100,
        }
    }
}

// Keeps the token secret out of logs
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("url", &self.url)
            .field("site_id", &self.site_id)
            .field("token_name", &self.token_name)
            .field("token_secret", &"***")
            .field("api_version", &self.api_version)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub download_dir: PathBuf,
    /// Audit snapshots, one JSON file per site
    pub snapshot_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub port: u16,
    pub mail_from: String,
    pub password: String,
    /// Comma separated recipients
    pub mail_to: String,
    pub subject_prefix: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            port: 587,
            mail_from: String::new(),
            password: String::new(),
            mail_to: String::new(),
            subject_prefix: "Tableau".to_string(),
        }
    }
}

impl EmailConfig {
    pub fn recipients(&self) -> Vec<String> {
        self.mail_to
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("smtp_server", &self.smtp_server)
            .field("port", &self.port)
            .field("mail_from", &self.mail_from)
            .field("password", &"***")
            .field("mail_to", &self.mail_to)
            .field("subject_prefix", &self.subject_prefix)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlackConfig {
    /// Incoming webhook; also the destination of the connection check
    pub webhook_url: Option<String>,
    pub bot_token: Option<String>,
    pub channel: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            bot_token: None,
            channel: "#sysadmin".to_string(),
        }
    }
}

impl SlackConfig {
    /// True when either delivery route is set
    pub fn is_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.webhook_url) || set(&self.bot_token)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address, `host:port`
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of the human format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PulseConfig {
    /// Datasource used by the Pulse check when the request names none
    pub datasource_name: Option<String>,
}
