// CLI-specific errors

use tabops_config::ConfigError;
use tabops_core::OpsError;
use tabops_http::HttpError;
use tabops_notify::NotifyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] HttpError),

    #[error("Notifier setup failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("{0}")]
    Operation(#[from] OpsError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Message with a hint where one helps
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(e) => format!(
                "Configuration error: {e}\n\nPass --config <PATH> or set TABOPS_CONFIG, or export TABOPS__SERVER__URL and friends."
            ),
            CliError::InvalidArgument { message } => {
                format!("Invalid argument: {message}\n\nRun 'tabops --help' for usage information.")
            }
            other => other.to_string(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_errors_keep_their_message() {
        let err = CliError::from(OpsError::Remote("Internal Server Error".to_string()));
        assert_eq!(err.user_message(), "Remote error: Internal Server Error");
    }

    #[test]
    fn test_config_errors_carry_a_hint() {
        let err = CliError::from(ConfigError::Validation("server.url must be set".to_string()));
        let message = err.user_message();
        assert!(message.contains("server.url must be set"));
        assert!(message.contains("TABOPS_CONFIG"));
    }
}
