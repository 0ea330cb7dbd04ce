//! Builds the planner and its adapters from resolved configuration.

use std::sync::Arc;

use log::info;
use tollroute_core::{
    PlannerPorts, RemoteCache, RouteStore, RoutePlanner, RoutingEngine, SqliteRouteStore,
    TwoTierCache,
};
use tollroute_data::cache::{RedisRestCache, RedisRestConfig};
use tollroute_data::geocoding::{
    GoogleConfig, GoogleGeocoder, NominatimConfig, NominatimReverseGeocoder,
};
use tollroute_data::routing::OsrmRoutingEngine;

use crate::CliError;
use crate::config::{CacheSettings, ServiceConfig};

/// Builds a planner for the current invocation.
pub(crate) trait PlannerBuilder {
    fn build(&self, config: &ServiceConfig) -> Result<RoutePlanner, CliError>;
}

/// Wires the SQLite store and the HTTP adapters.
pub(crate) struct AdapterPlannerBuilder;

impl PlannerBuilder for AdapterPlannerBuilder {
    fn build(&self, config: &ServiceConfig) -> Result<RoutePlanner, CliError> {
        let store =
            SqliteRouteStore::open(config.database.as_std_path()).map_err(|source| {
                CliError::Store {
                    path: config.database.clone(),
                    source,
                }
            })?;
        let routing = OsrmRoutingEngine::new(config.routing_engine_url.clone()).map_err(
            |source| CliError::BuildAdapter {
                adapter: "routing engine",
                base_url: config.routing_engine_url.clone(),
                source,
            },
        )?;
        let geocoder = GoogleGeocoder::with_config(GoogleConfig::new(
            config.geocoder_api_key.clone(),
        ))
        .map_err(|source| CliError::BuildAdapter {
            adapter: "geocoder",
            base_url: tollroute_data::geocoding::GOOGLE_MAPS_API.to_owned(),
            source,
        })?;
        let reverse = NominatimReverseGeocoder::with_config(&NominatimConfig::new(
            config.nominatim_url.clone(),
        ))
        .map_err(|source| CliError::BuildAdapter {
            adapter: "reverse geocoder",
            base_url: config.nominatim_url.clone(),
            source,
        })?;
        let cache = config
            .cache
            .as_ref()
            .map_or_else(|| Ok(TwoTierCache::local_only()), remote_cache)?;
        info!(
            "planner wired: store {}, routing {}, remote cache {}",
            config.database,
            config.routing_engine_url,
            config.cache.is_some()
        );
        Ok(RoutePlanner::new(
            PlannerPorts {
                store: Arc::new(store) as Arc<dyn RouteStore>,
                geocoder: Arc::new(geocoder),
                reverse: Arc::new(reverse),
                routing: Arc::new(routing) as Arc<dyn RoutingEngine>,
                cache: Arc::new(cache),
            },
            config.planner.clone(),
        ))
    }
}

fn remote_cache(settings: &CacheSettings) -> Result<TwoTierCache, CliError> {
    let config = settings
        .token
        .iter()
        .fold(RedisRestConfig::new(settings.url.clone()), |config_so_far, token| {
            config_so_far.with_token(token.clone())
        });
    let remote = RedisRestCache::with_config(config).map_err(|source| CliError::BuildAdapter {
        adapter: "remote cache",
        base_url: settings.url.clone(),
        source,
    })?;
    Ok(TwoTierCache::new(Arc::new(remote) as Arc<dyn RemoteCache>))
}
