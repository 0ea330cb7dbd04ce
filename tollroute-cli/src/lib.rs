//! Command-line interface for the toll route planner.
//!
//! - `tollroute serve` starts the HTTP API.
//! - `tollroute plan <request.json>` plans one private request and prints the
//!   result as JSON.
//! - `tollroute seed <seed.json>` loads POI tables into the SQLite store.
//!
//! Options layer CLI flags over environment variables over configuration
//! files through `ortho_config`, with the `TOLLROUTE` prefix.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod config;
mod error;
mod plan;
mod seed;
mod serve;
mod wiring;

pub use error::CliError;

use config::{PlanArgs, SeedArgs, ServeArgs};

pub(crate) const ARG_GEOCODER_API_KEY: &str = "geocoder-api-key";
pub(crate) const ARG_PLAN_REQUEST: &str = "request";
pub(crate) const ARG_SEED_PATH: &str = "seed";
pub(crate) const ENV_SERVE_GEOCODER_API_KEY: &str = "TOLLROUTE_CMDS_SERVE_GEOCODER_API_KEY";
pub(crate) const ENV_PLAN_GEOCODER_API_KEY: &str = "TOLLROUTE_CMDS_PLAN_GEOCODER_API_KEY";
pub(crate) const ENV_PLAN_REQUEST: &str = "TOLLROUTE_CMDS_PLAN_REQUEST_PATH";
pub(crate) const ENV_SEED_PATH: &str = "TOLLROUTE_CMDS_SEED_SEED_PATH";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns the first failure of argument parsing, configuration or the
/// selected command.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse()?;
    match cli.command {
        Command::Serve(args) => serve::run_serve(args),
        Command::Plan(args) => plan::run_plan(args),
        Command::Seed(args) => seed::run_seed(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "tollroute",
    about = "Toll-aware truck route planning for Brazilian roads",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Plan one request read from a JSON file.
    Plan(PlanArgs),
    /// Load POI tables from a JSON seed document.
    Seed(SeedArgs),
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

#[cfg(test)]
mod tests;
