// tabops entry point

use anyhow::Context;
use clap::Parser;
use tabops_cli::{commands, logging, output, wiring, Cli, CliError};
use tabops_config::ConfigManager;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            let message = match e.downcast_ref::<CliError>() {
                Some(cli_error) => cli_error.user_message(),
                None => format!("{e:#}"),
            };
            output::print_error(&message);
            std::process::exit(2);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    let config = manager
        .load_config()
        .map_err(CliError::from)
        .with_context(|| format!("loading {}", manager.config_path().display()))?;

    logging::init_logging(&config.logging, cli.verbose)?;
    tracing::debug!(path = %manager.config_path().display(), "Configuration loaded");

    let state = wiring::build_state(config).context("initialising services")?;
    Ok(commands::execute(cli.command, state).await?)
}
