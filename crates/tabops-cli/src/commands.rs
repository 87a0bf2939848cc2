// Command dispatch

use std::net::SocketAddr;

use tabops_api::models::{AuditResponse, PulseResponse, SiteActivityResponse, TcmAccessResponse};
use tabops_api::{ApiServer, AppState};
use tabops_config::AppConfig;
use tracing::{error, info};

use crate::cli::Commands;
use crate::error::{CliError, CliResult};
use crate::output;

/// Listen address: `--bind` if given, else `api.bind`
pub fn bind_addr(config: &AppConfig, bind: Option<&str>) -> CliResult<SocketAddr> {
    let raw = bind.unwrap_or(&config.api.bind);
    raw.parse().map_err(|e| CliError::InvalidArgument {
        message: format!("bind address '{raw}': {e}"),
    })
}

/// Run one command; `Ok(false)` means the check ran and failed
pub async fn execute(command: Commands, state: AppState) -> CliResult<bool> {
    info!(command = command.name(), "Running command");
    match command {
        Commands::Serve { bind } => {
            let addr = bind_addr(&state.config, bind.as_deref())?;
            ApiServer::new(state, addr).run(shutdown_signal()).await?;
            Ok(true)
        }
        Commands::Audit { site } => {
            report(state.audit.run(site.as_deref()).await.map(AuditResponse::from))
        }
        Commands::Tcm { site } => report(
            state
                .monitor
                .tcm_access(site.as_deref())
                .await
                .map(TcmAccessResponse::from),
        ),
        Commands::Activity => report(
            state
                .monitor
                .site_activity()
                .await
                .map(SiteActivityResponse::from),
        ),
        Commands::Pulse { datasource } => report(
            state
                .monitor
                .validate_pulse(datasource.as_deref())
                .await
                .map(PulseResponse::from),
        ),
    }
}

fn report<T: serde::Serialize>(outcome: tabops_core::Result<T>) -> CliResult<bool> {
    match outcome {
        Ok(body) => {
            output::print_json(&body);
            Ok(true)
        }
        Err(e) => {
            error!("Command failed: {e}");
            output::print_json(&output::failure(&e.to_string()));
            Ok(false)
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => error!("Failed to listen for shutdown signal: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_flag_overrides_config() {
        let config = AppConfig::default();
        assert_eq!(bind_addr(&config, None).unwrap().port(), 8000);
        assert_eq!(bind_addr(&config, Some("0.0.0.0:9000")).unwrap().port(), 9000);
    }

    #[test]
    fn test_bad_bind_is_invalid_argument() {
        let config = AppConfig::default();
        assert!(matches!(
            bind_addr(&config, Some("localhost")),
            Err(CliError::InvalidArgument { .. })
        ));
    }
}
