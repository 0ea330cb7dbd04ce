//! `tollroute plan`: plan one request from a JSON file.

use std::io::Write;

use camino::Utf8Path;
use tollroute_core::request::Scope;
use tollroute_core::{Caller, FinalOutput, RouteRequest, RouteRequestPayload};

use crate::config::PlanArgs;
use crate::wiring::{AdapterPlannerBuilder, PlannerBuilder};
use crate::{CliError, runtime};

pub(crate) fn run_plan(args: PlanArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_plan_with(args, &AdapterPlannerBuilder, &mut stdout)
}

pub(crate) fn run_plan_with(
    args: PlanArgs,
    builder: &dyn PlannerBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let mut request = load_plan_request(&config.request_path)?;
    request.trip.scope = Scope::Private;
    let planner = builder.build(&config.service)?;
    let output = runtime()?.block_on(planner.plan(request, Caller::user(config.user_id)))?;
    write_plan_output(writer, &output)
}

fn load_plan_request(path: &Utf8Path) -> Result<RouteRequest, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadRequest {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: RouteRequestPayload =
        serde_json::from_str(&raw).map_err(|source| CliError::ParseRequest {
            path: path.to_path_buf(),
            source,
        })?;
    RouteRequest::try_from(payload).map_err(|source| CliError::InvalidRequest {
        path: path.to_path_buf(),
        source,
    })
}

fn write_plan_output(writer: &mut dyn Write, output: &FinalOutput) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(output).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(rendered.as_bytes())
        .and_then(|()| writer.write_all(b"\n"))
        .map_err(CliError::WriteOutput)
}
