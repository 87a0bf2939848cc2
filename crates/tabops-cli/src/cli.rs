// Command line definition

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// tabops - automation layer over the Tableau admin REST API
#[derive(Parser, Debug)]
#[command(name = "tabops")]
#[command(bin_name = "tabops")]
#[command(about = "Automation layer over the Tableau admin REST API")]
#[command(
    long_about = "tabops: content administration, downloads, audits and site checks for Tableau.\n\n  • tabops serve      Run the HTTP API\n  • tabops audit      Snapshot site counts and alert on drops\n  • tabops tcm        Check Tableau Cloud Manager access\n  • tabops activity   Report new users and groups\n  • tabops pulse      Check that Pulse metrics can be created"
)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (YAML or TOML), overrides TABOPS_CONFIG
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging when RUST_LOG is unset
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API until interrupted
    Serve {
        /// Listen address, overrides api.bind
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Audit user, group and role counts against the last snapshot
    Audit {
        /// Site content URL, defaults to server.site_id
        #[arg(long)]
        site: Option<String>,
    },

    /// Check whether the signed-in user can reach Tableau Cloud Manager
    Tcm {
        /// Site content URL, defaults to server.site_id
        #[arg(long)]
        site: Option<String>,
    },

    /// Report users and groups created in the last 24 hours
    Activity,

    /// Check that Pulse is enabled and a metric can be defined
    Pulse {
        /// Datasource for the sample metric, defaults to pulse.datasource_name
        #[arg(long)]
        datasource: Option<String>,
    },
}

impl Commands {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Serve { .. } => "serve",
            Commands::Audit { .. } => "audit",
            Commands::Tcm { .. } => "tcm",
            Commands::Activity => "activity",
            Commands::Pulse { .. } => "pulse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_audit_with_site() {
        let cli = Cli::try_parse_from(["tabops", "audit", "--site", "prod"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Audit {
                site: Some("prod".to_string())
            }
        );
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["tabops", "serve", "--bind", "0.0.0.0:9000", "-v", "--config", "c.yaml"])
                .unwrap();
        assert_eq!(cli.command.name(), "serve");
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["tabops"]).is_err());
    }
}
