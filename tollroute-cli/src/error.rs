//! Errors emitted by the `tollroute` command.
//!
//! Kept reasonably small: most helpers return `Result<_, CliError>` and the
//! workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use tollroute_core::{PlanError, RequestError, StoreError};
use tollroute_data::ProviderBuildError;
use tollroute_data::seed::SeedError;

/// Errors emitted by the `tollroute` command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable name.
        env: &'static str,
    },
    /// An adapter could not be constructed.
    #[error("failed to build {adapter} client for {base_url:?}: {source}")]
    BuildAdapter {
        /// Which adapter failed.
        adapter: &'static str,
        /// URL it was pointed at.
        base_url: String,
        /// Underlying failure.
        #[source]
        source: ProviderBuildError,
    },
    /// Opening or writing the SQLite store failed.
    #[error("route store {path:?} failed: {source}")]
    Store {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: StoreError,
    },
    /// The seed document could not be loaded.
    #[error(transparent)]
    Seed(#[from] SeedError),
    /// The Tokio runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The listener could not bind.
    #[error("failed to bind {bind}: {source}")]
    Bind {
        /// Requested address.
        bind: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The server stopped with an error.
    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),
    /// Opening the request file failed.
    #[error("failed to read plan request at {path:?}: {source}")]
    ReadRequest {
        /// Request path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The request file is not a route request.
    #[error("failed to parse plan request JSON at {path:?}: {source}")]
    ParseRequest {
        /// Request path.
        path: Utf8PathBuf,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// The request failed validation.
    #[error("plan request in {path:?} is invalid: {source}")]
    InvalidRequest {
        /// Request path.
        path: Utf8PathBuf,
        /// Validation failure.
        #[source]
        source: RequestError,
    },
    /// Planning failed.
    #[error("planning failed: {0}")]
    Plan(#[source] Box<PlanError>),
    /// Serialising the plan output failed.
    #[error("failed to serialise plan output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

impl From<PlanError> for CliError {
    fn from(err: PlanError) -> Self {
        Self::Plan(Box::new(err))
    }
}
