// Tracing subscriber setup

use tabops_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};

/// Filter directive: `RUST_LOG` wins, then `--verbose`, then the configured level
pub fn directive(config: &LoggingConfig, verbose: bool, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(from_env) => from_env.to_string(),
        None if verbose => "debug".to_string(),
        None if config.level.trim().is_empty() => "info".to_string(),
        None => config.level.trim().to_string(),
    }
}

/// Install the global subscriber, writing to stderr
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> CliResult<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = directive(config, verbose, rust_log.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| CliError::Logging(format!("invalid filter '{directive}': {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| CliError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            json: false,
        }
    }

    #[test]
    fn test_rust_log_wins() {
        assert_eq!(directive(&level("warn"), true, Some("tabops_core=trace")), "tabops_core=trace");
    }

    #[test]
    fn test_verbose_beats_configured_level() {
        assert_eq!(directive(&level("warn"), true, None), "debug");
        assert_eq!(directive(&level("warn"), false, None), "warn");
    }

    #[test]
    fn test_blank_values_fall_back_to_info() {
        assert_eq!(directive(&level(" "), false, Some("")), "info");
    }
}
