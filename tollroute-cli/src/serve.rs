//! `tollroute serve`: run the HTTP API until the process is stopped.

use std::sync::Arc;

use tokio::net::TcpListener;
use tollroute_http::AppState;

use crate::config::ServeArgs;
use crate::wiring::{AdapterPlannerBuilder, PlannerBuilder};
use crate::{CliError, runtime};

pub(crate) fn run_serve(args: ServeArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let planner = AdapterPlannerBuilder.build(&config.service)?;
    let state = AppState::new(Arc::new(planner));
    let runtime = runtime()?;
    let listener = runtime
        .block_on(TcpListener::bind(&config.bind))
        .map_err(|source| CliError::Bind {
            bind: config.bind.clone(),
            source,
        })?;
    runtime
        .block_on(tollroute_http::serve(listener, state))
        .map_err(CliError::Serve)
}
