//! Endpoint handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use serde_json::{Value, json};
use tollroute_core::request::Scope;
use tollroute_core::store::FavoriteRoute;
use tollroute_core::{
    CoordinateRouteRequest, CoordinateRouteRequestPayload, FinalOutput, PlanError, RouteRequest,
    RouteRequestPayload, SimpleRouteOutput, SimpleRouteRequest,
};

use crate::error::ApiError;
use crate::identity::Identity;
use crate::AppState;

type Body<T> = Result<Json<T>, JsonRejection>;

/// A favourite as listed to its owner.
#[derive(Debug, Serialize)]
pub struct FavoriteView {
    id: i64,
    id_user: i64,
    origin: String,
    destination: String,
    waypoints: String,
    response: Value,
    created_at: DateTime<Utc>,
}

impl From<FavoriteRoute> for FavoriteView {
    fn from(row: FavoriteRoute) -> Self {
        let response = serde_json::from_str(&row.response_blob).unwrap_or_else(|err| {
            warn!("favourite {} holds an unreadable response: {err}", row.id);
            Value::Null
        });
        Self {
            id: row.id,
            id_user: row.user_id,
            origin: row.origin,
            destination: row.destination,
            waypoints: row.waypoints_key,
            response,
            created_at: row.created_at,
        }
    }
}

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn plan_addresses(
    state: &AppState,
    identity: Identity,
    body: Body<RouteRequestPayload>,
    scope: Scope,
) -> Result<Json<FinalOutput>, ApiError> {
    let Json(payload) = body?;
    let mut request = RouteRequest::try_from(payload).map_err(PlanError::from)?;
    request.trip.scope = scope;
    let output = state.planner().plan(request, identity.0).await?;
    Ok(Json(output))
}

/// Public endpoint: billed against the caller's token whatever the body says.
pub async fn check_route_tolls(
    State(state): State<AppState>,
    identity: Identity,
    body: Body<RouteRequestPayload>,
) -> Result<Json<FinalOutput>, ApiError> {
    plan_addresses(&state, identity, body, Scope::Public).await
}

/// Private endpoint for the first-party app, keyed by `x-user-id`.
pub async fn check_route_tolls_easy(
    State(state): State<AppState>,
    identity: Identity,
    body: Body<RouteRequestPayload>,
) -> Result<Json<FinalOutput>, ApiError> {
    plan_addresses(&state, identity, body, Scope::Private).await
}

/// Private endpoint for second-party integrations, keyed by `x-user-id`.
pub async fn check_route_tolls_simpplify(
    State(state): State<AppState>,
    identity: Identity,
    body: Body<RouteRequestPayload>,
) -> Result<Json<FinalOutput>, ApiError> {
    plan_addresses(&state, identity, body, Scope::Private).await
}

/// Coordinate endpoint: the body's `publicOrPrivate` decides the scope.
pub async fn check_route_tolls_coordinate(
    State(state): State<AppState>,
    identity: Identity,
    body: Body<CoordinateRouteRequestPayload>,
) -> Result<Json<FinalOutput>, ApiError> {
    let Json(payload) = body?;
    let request = CoordinateRouteRequest::try_from(payload).map_err(PlanError::from)?;
    let output = state.planner().plan_coordinates(request, identity.0).await?;
    Ok(Json(output))
}

/// Distance and duration between two coordinates, without enrichment.
pub async fn simple_route(
    State(state): State<AppState>,
    body: Body<SimpleRouteRequest>,
) -> Result<Json<SimpleRouteOutput>, ApiError> {
    let Json(request) = body?;
    Ok(Json(state.planner().simple_route(&request).await?))
}

fn require_user(identity: Identity) -> Result<i64, ApiError> {
    identity
        .0
        .user_id
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Plan(PlanError::BadRequest("ID inválido".to_owned())))
}

/// The caller's favourites, newest first.
pub async fn list_favorites(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<FavoriteView>>, ApiError> {
    let user_id = require_user(identity)?;
    let favorites = state.planner().favorites(user_id).await?;
    Ok(Json(favorites.into_iter().map(FavoriteView::from).collect()))
}

/// Removing a favourite the caller does not own, or that does not exist,
/// still answers `"success"`.
pub async fn remove_favorite(
    State(state): State<AppState>,
    identity: Identity,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<&'static str>, ApiError> {
    let Path(id) = id?;
    let user_id = require_user(identity)?;
    if !state.planner().remove_favorite(user_id, id).await? {
        warn!("user {user_id} removed favourite {id}, which they do not own");
    }
    Ok(Json("success"))
}
