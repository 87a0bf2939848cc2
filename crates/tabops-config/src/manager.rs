//! Configuration manager implementation

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use tracing::{debug, info};

use crate::{
    error::{ConfigError, Result},
    types::AppConfig,
};

/// Prefix of environment overrides, e.g. `TABOPS__SERVER__URL`
pub const ENV_PREFIX: &str = "TABOPS";

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "TABOPS_CONFIG";

/// Configuration manager
pub struct ConfigManager {
    /// Configuration file path
    config_path: PathBuf,
    /// Whether a missing file is an error
    required: bool,
    /// Environment snapshot; `None` reads the process environment
    env: Option<HashMap<String, String>>,
}

impl ConfigManager {
    /// Use `TABOPS_CONFIG` when set, otherwise the per-user default path
    pub fn new() -> Self {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::with_path(PathBuf::from(path)),
            _ => Self {
                config_path: Self::default_config_path(),
                required: false,
                env: None,
            },
        }
    }

    /// Load from an explicit file, which must exist
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            required: true,
            env: None,
        }
    }

    /// Read overrides from `vars` instead of the process environment
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get default config path
    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabops")
            .join("config.yaml")
    }

    /// Load file and environment layers, then validate
    pub fn load_config(&self) -> Result<AppConfig> {
        if self.required && !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.display().to_string()));
        }

        let builder = Config::builder()
            .add_source(File::from(self.config_path.clone()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(self.env.clone()),
            );

        let app_config: AppConfig = builder.build()?.try_deserialize()?;
        debug!(path = %self.config_path.display(), "Configuration loaded");
        self.validate_config(&app_config)?;
        Ok(app_config)
    }

    /// Write `config` as YAML, or TOML for a `.toml` path
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        let text = match self.config_path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::to_string(config)?,
            _ => serde_yaml::to_string(config)?,
        };
        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, text)?;
        info!(path = %self.config_path.display(), "Configuration saved");
        Ok(())
    }

    pub fn validate_config(&self, config: &AppConfig) -> Result<()> {
        let required = [
            ("server.url", &config.server.url),
            ("server.site_id", &config.server.site_id),
            ("server.token_name", &config.server.token_name),
            ("server.token_secret", &config.server.token_secret),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must be set")));
            }
        }
        if config.server.page_size == 0 {
            return Err(ConfigError::Validation(
                "server.page_size must be greater than 0".to_string(),
            ));
        }

        if config.email.enabled {
            if config.email.smtp_server.trim().is_empty() || config.email.port == 0 {
                return Err(ConfigError::Validation(
                    "email.smtp_server and email.port are required when email is enabled".to_string(),
                ));
            }
            if config.email.mail_from.trim().is_empty() || config.email.recipients().is_empty() {
                return Err(ConfigError::Validation(
                    "email.mail_from and email.mail_to are required when email is enabled".to_string(),
                ));
            }
        }

        config.api.bind.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Validation(format!("api.bind '{}' is not an address: {e}", config.api.bind))
        })?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const YAML: &str = r#"
server:
  url: https://prod.online.tableau.com
  site_id: dev
  token_name: automation
  token_secret: secret
storage:
  download_dir: /tmp/tabops/downloads
slack:
  webhook_url: https://hooks.slack.com/services/T/B/X
"#;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_load_yaml_with_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(write(&dir, "config.yaml", YAML)).with_env(HashMap::new());

        let config = manager.load_config().unwrap();

        assert_eq!(config.server.site_id, "dev");
        assert_eq!(config.server.api_version, "3.22");
        assert_eq!(config.storage.download_dir, PathBuf::from("/tmp/tabops/downloads"));
        assert_eq!(config.storage.snapshot_dir, PathBuf::from("snapshots"));
        assert_eq!(config.slack.channel, "#sysadmin");
        assert!(config.slack.is_configured());
        assert!(!config.email.enabled);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let env = HashMap::from([
            ("TABOPS__SERVER__SITE_ID".to_string(), "prod".to_string()),
            ("TABOPS__EMAIL__PORT".to_string(), "2525".to_string()),
            ("TABOPS__LOGGING__JSON".to_string(), "true".to_string()),
        ]);
        let manager = ConfigManager::with_path(write(&dir, "config.yaml", YAML)).with_env(env);

        let config = manager.load_config().unwrap();

        assert_eq!(config.server.site_id, "prod");
        assert_eq!(config.email.port, 2525);
        assert!(config.logging.json);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("absent.yaml"));
        assert!(matches!(manager.load_config(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", "server:\n  url: https://x\n  site_id: dev\n");
        let err = ConfigManager::with_path(path)
            .with_env(HashMap::new())
            .load_config()
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: server.token_name must be set");
    }

    #[test]
    fn test_save_then_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let source = ConfigManager::with_path(write(&dir, "config.yaml", YAML))
            .with_env(HashMap::new())
            .load_config()
            .unwrap();

        let manager = ConfigManager::with_path(path).with_env(HashMap::new());
        manager.save_config(&source).unwrap();

        assert_eq!(manager.load_config().unwrap(), source);
    }
}
