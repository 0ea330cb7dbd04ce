//! Mapping of planner failures onto HTTP responses.
//!
//! Every error body is a single JSON string holding the Portuguese message.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use tollroute_core::PlanError;

/// Status code for a planner failure.
#[must_use]
pub const fn status_for(err: &PlanError) -> StatusCode {
    match err {
        PlanError::BadRequest(_) | PlanError::QuotaExceeded { .. } => StatusCode::BAD_REQUEST,
        PlanError::AddressNotFound { .. }
        | PlanError::RoutingUnavailable { .. }
        | PlanError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Failure of a handler.
#[derive(Debug)]
pub enum ApiError {
    /// The planner refused or failed the request.
    Plan(PlanError),
    /// The request could not be read.
    Malformed(String),
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        Self::Plan(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Plan(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    error!("request failed: {err}");
                } else {
                    warn!("request refused: {err}");
                }
                (status, err.to_string())
            }
            Self::Malformed(message) => {
                warn!("malformed request: {message}");
                (StatusCode::BAD_REQUEST, message)
            }
        };
        (status, Json(message)).into_response()
    }
}
