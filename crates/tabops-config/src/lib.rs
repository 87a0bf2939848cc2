//! tabops configuration
//!
//! Typed settings for the server connection, storage directories, email and
//! Slack delivery, the HTTP client, the API listener and logging. Values come
//! from an optional YAML/TOML file overlaid with `TABOPS__SECTION__KEY`
//! environment variables, and are loaded once at process start.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use manager::{ConfigManager, CONFIG_PATH_ENV, ENV_PREFIX};
pub use types::{
    ApiConfig, AppConfig, EmailConfig, LoggingConfig, PulseConfig, ServerConfig, SlackConfig,
    StorageConfig,
};
pub use tabops_http::HttpConfig;
