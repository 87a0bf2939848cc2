//! tabops command line
//!
//! Loads configuration, initialises logging, wires the Tableau session
//! provider and notifiers into an [`tabops_api::AppState`] and runs either
//! the HTTP API or one of the scheduled checks.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod wiring;

pub use cli::{Cli, Commands};
pub use error::{CliError, CliResult};
