//! HTTP surface of the toll route planner.
//!
//! [`router`] wires every endpoint onto a shared [`RoutePlanner`]; [`serve`]
//! runs it on a bound listener. Callers are identified by the
//! `x-public-token-id` and `x-user-id` headers set by the authenticating
//! proxy in front of this service.

mod error;
mod handlers;
mod identity;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{Request, Response};
use axum::routing::{get, post, put};
use tokio::net::TcpListener;
use tollroute_core::RoutePlanner;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Level, Span};

pub use error::{ApiError, status_for};
pub use identity::{Identity, PUBLIC_TOKEN_HEADER, USER_HEADER};

/// State shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    planner: Arc<RoutePlanner>,
}

impl AppState {
    /// State serving requests with `planner`.
    #[must_use]
    pub const fn new(planner: Arc<RoutePlanner>) -> Self {
        Self { planner }
    }

    /// The shared planner.
    #[must_use]
    pub fn planner(&self) -> &RoutePlanner {
        &self.planner
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/check-route-tolls", post(handlers::check_route_tolls))
        .route("/check-route-tolls-easy", post(handlers::check_route_tolls_easy))
        .route(
            "/check-route-tolls-simpplify",
            post(handlers::check_route_tolls_simpplify),
        )
        .route(
            "/check-route-tolls-coordinate",
            post(handlers::check_route_tolls_coordinate),
        )
        .route("/route/simple", post(handlers::simple_route))
        .route("/route/favorite/list", get(handlers::list_favorites))
        .route(
            "/route/favorite/remove/:id",
            put(handlers::remove_favorite),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::span!(
                        Level::INFO,
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(|request: &Request<_>, _span: &Span| {
                    tracing::debug!("{} {}", request.method(), request.uri());
                })
                .on_response(|response: &Response<_>, latency: Duration, _span: &Span| {
                    tracing::info!(
                        "status={} latency={}ms",
                        response.status(),
                        latency.as_millis()
                    );
                })
                .on_failure(
                    |failure: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                        tracing::error!("request failed: {failure} after {}ms", latency.as_millis());
                    },
                ),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `state` on `listener` until the process is stopped.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("listening on {addr}");
    }
    axum::serve(listener, router(state)).await
}
