use tabops_config::*;

fn valid() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.url = "https://prod.online.tableau.com".to_string();
    config.server.site_id = "dev".to_string();
    config.server.token_name = "automation".to_string();
    config.server.token_secret = "secret".to_string();
    config
}

#[test]
fn test_app_config_default() {
    let config = AppConfig::default();
    assert_eq!(config.server.api_version, "3.22");
    assert_eq!(config.server.page_size, 100);
    assert_eq!(config.email.port, 587);
    assert_eq!(config.email.subject_prefix, "Tableau");
    assert_eq!(config.api.bind, "127.0.0.1:8000");
    assert_eq!(config.logging.level, "info");
    assert!(config.pulse.datasource_name.is_none());
}

#[test]
fn test_config_validation() {
    let manager = ConfigManager::with_path("unused.yaml".into());
    let mut config = valid();
    assert!(manager.validate_config(&config).is_ok());

    config.email.enabled = true;
    assert!(manager.validate_config(&config).is_err());

    config.email.smtp_server = "smtp.example.com".to_string();
    config.email.mail_from = "tabops@example.com".to_string();
    config.email.mail_to = "a@example.com, b@example.com".to_string();
    assert!(manager.validate_config(&config).is_ok());
    assert_eq!(config.email.recipients().len(), 2);

    config.api.bind = "not an address".to_string();
    assert!(matches!(
        manager.validate_config(&config),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_secrets_hidden_from_debug() {
    let mut config = valid();
    config.email.password = "hunter2".to_string();
    let text = format!("{config:?}");
    assert!(!text.contains("secret\""));
    assert!(!text.contains("hunter2"));
}

#[test]
fn test_slack_configured_only_with_route() {
    let mut slack = SlackConfig::default();
    assert!(!slack.is_configured());
    slack.bot_token = Some("  ".to_string());
    assert!(!slack.is_configured());
    slack.bot_token = Some("xoxb-1".to_string());
    assert!(slack.is_configured());
}
