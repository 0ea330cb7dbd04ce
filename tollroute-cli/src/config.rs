//! Subcommand arguments and their resolved configuration.

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tollroute_core::PlannerConfig;
use tollroute_core::assets::AssetUrls;
use tollroute_data::geocoding::NOMINATIM_API;
use tollroute_data::routing::OsrmConfig;

use crate::{
    ARG_GEOCODER_API_KEY, ARG_PLAN_REQUEST, ARG_SEED_PATH, CliError, ENV_PLAN_GEOCODER_API_KEY,
    ENV_PLAN_REQUEST, ENV_SEED_PATH, ENV_SERVE_GEOCODER_API_KEY,
};

const DEFAULT_DATABASE: &str = "tollroute.db";
const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_USER_ID: i64 = 1;

/// CLI arguments for the `serve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Serve the route planning HTTP API")]
#[ortho_config(prefix = "TOLLROUTE")]
pub(crate) struct ServeArgs {
    /// Address to listen on.
    #[arg(long, value_name = "addr")]
    #[serde(default)]
    pub(crate) bind: Option<String>,
    /// Base URL of the OSRM routing engine.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) routing_engine_url: Option<String>,
    /// Google Maps API key.
    #[arg(long = ARG_GEOCODER_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) geocoder_api_key: Option<String>,
    /// Base URL of the Nominatim reverse geocoder.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) nominatim_url: Option<String>,
    /// Redis REST gateway for the remote cache tier.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) cache_url: Option<String>,
    /// Bearer token for the cache gateway.
    #[arg(long, value_name = "token")]
    #[serde(default)]
    pub(crate) cache_token: Option<String>,
    /// Requests a public token may make per day.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) public_quota_max: Option<u32>,
    /// POI matching corridor in metres.
    #[arg(long, value_name = "metres")]
    #[serde(default)]
    pub(crate) poi_corridor_m: Option<f64>,
    /// SQLite database path.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Host of the instruction icons.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) icon_base_url: Option<String>,
}

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Plan one request read from a JSON file as a private \
                 request and print the result as JSON on stdout.",
    about = "Plan one route request"
)]
#[ortho_config(prefix = "TOLLROUTE")]
pub(crate) struct PlanArgs {
    /// Path to a JSON route request.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// User the request is recorded for.
    #[arg(long, value_name = "id")]
    #[serde(default)]
    pub(crate) user_id: Option<i64>,
    /// Base URL of the OSRM routing engine.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) routing_engine_url: Option<String>,
    /// Google Maps API key.
    #[arg(long = ARG_GEOCODER_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) geocoder_api_key: Option<String>,
    /// Base URL of the Nominatim reverse geocoder.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) nominatim_url: Option<String>,
    /// Redis REST gateway for the remote cache tier.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) cache_url: Option<String>,
    /// Bearer token for the cache gateway.
    #[arg(long, value_name = "token")]
    #[serde(default)]
    pub(crate) cache_token: Option<String>,
    /// POI matching corridor in metres.
    #[arg(long, value_name = "metres")]
    #[serde(default)]
    pub(crate) poi_corridor_m: Option<f64>,
    /// SQLite database path.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Host of the instruction icons.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) icon_base_url: Option<String>,
}

/// CLI arguments for the `seed` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Load POI tables from a JSON seed document")]
#[ortho_config(prefix = "TOLLROUTE")]
pub(crate) struct SeedArgs {
    /// Path to the seed document.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) seed_path: Option<Utf8PathBuf>,
    /// SQLite database path.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

/// Optional service keys shared by `serve` and `plan`.
#[derive(Debug, Clone, Default)]
struct ServiceLayer {
    routing_engine_url: Option<String>,
    geocoder_api_key: Option<String>,
    nominatim_url: Option<String>,
    cache_url: Option<String>,
    cache_token: Option<String>,
    public_quota_max: Option<u32>,
    poi_corridor_m: Option<f64>,
    database: Option<Utf8PathBuf>,
    icon_base_url: Option<String>,
}

/// Remote cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CacheSettings {
    /// Gateway URL.
    pub(crate) url: String,
    /// Bearer token.
    pub(crate) token: Option<String>,
}

/// Resolved configuration of the planning service.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServiceConfig {
    /// OSRM base URL.
    pub(crate) routing_engine_url: String,
    /// Google Maps API key.
    pub(crate) geocoder_api_key: String,
    /// Nominatim base URL.
    pub(crate) nominatim_url: String,
    /// Remote cache tier, if configured.
    pub(crate) cache: Option<CacheSettings>,
    /// SQLite database path.
    pub(crate) database: Utf8PathBuf,
    /// Planner tunables.
    pub(crate) planner: PlannerConfig,
}

impl ServiceConfig {
    fn resolve(layer: ServiceLayer, key_env: &'static str) -> Result<Self, CliError> {
        let geocoder_api_key = layer
            .geocoder_api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_GEOCODER_API_KEY,
                env: key_env,
            })?;
        let defaults = PlannerConfig::default();
        let assets = layer
            .icon_base_url
            .map_or_else(AssetUrls::default, |base| {
                AssetUrls::default().with_icon_base_url(base)
            });
        Ok(Self {
            routing_engine_url: layer
                .routing_engine_url
                .unwrap_or_else(|| OsrmConfig::default().base_url),
            geocoder_api_key,
            nominatim_url: layer
                .nominatim_url
                .unwrap_or_else(|| NOMINATIM_API.to_owned()),
            cache: layer.cache_url.map(|url| CacheSettings {
                url,
                token: layer.cache_token,
            }),
            database: layer
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            planner: PlannerConfig {
                public_quota_max: layer.public_quota_max.unwrap_or(defaults.public_quota_max),
                corridor_m: layer.poi_corridor_m.unwrap_or(defaults.corridor_m),
                assets,
                poi_deadline: defaults.poi_deadline,
            },
        })
    }
}

/// Resolved `serve` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServeConfig {
    pub(crate) bind: String,
    pub(crate) service: ServiceConfig,
}

impl ServeArgs {
    pub(crate) fn into_config(self) -> Result<ServeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ServeConfig::try_from(merged)
    }
}

impl TryFrom<ServeArgs> for ServeConfig {
    type Error = CliError;

    fn try_from(args: ServeArgs) -> Result<Self, Self::Error> {
        let service = ServiceConfig::resolve(
            ServiceLayer {
                routing_engine_url: args.routing_engine_url,
                geocoder_api_key: args.geocoder_api_key,
                nominatim_url: args.nominatim_url,
                cache_url: args.cache_url,
                cache_token: args.cache_token,
                public_quota_max: args.public_quota_max,
                poi_corridor_m: args.poi_corridor_m,
                database: args.database,
                icon_base_url: args.icon_base_url,
            },
            ENV_SERVE_GEOCODER_API_KEY,
        )?;
        Ok(Self {
            bind: args.bind.unwrap_or_else(|| DEFAULT_BIND.to_owned()),
            service,
        })
    }
}

/// Resolved `plan` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlanConfig {
    pub(crate) request_path: Utf8PathBuf,
    pub(crate) user_id: i64,
    pub(crate) service: ServiceConfig,
}

impl PlanArgs {
    pub(crate) fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_PLAN_REQUEST,
            env: ENV_PLAN_REQUEST,
        })?;
        let service = ServiceConfig::resolve(
            ServiceLayer {
                routing_engine_url: args.routing_engine_url,
                geocoder_api_key: args.geocoder_api_key,
                nominatim_url: args.nominatim_url,
                cache_url: args.cache_url,
                cache_token: args.cache_token,
                public_quota_max: None,
                poi_corridor_m: args.poi_corridor_m,
                database: args.database,
                icon_base_url: args.icon_base_url,
            },
            ENV_PLAN_GEOCODER_API_KEY,
        )?;
        Ok(Self {
            request_path,
            user_id: args.user_id.unwrap_or(DEFAULT_USER_ID),
            service,
        })
    }
}

/// Resolved `seed` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedConfig {
    pub(crate) seed_path: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
}

impl SeedArgs {
    pub(crate) fn into_config(self) -> Result<SeedConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SeedConfig::try_from(merged)
    }
}

impl TryFrom<SeedArgs> for SeedConfig {
    type Error = CliError;

    fn try_from(args: SeedArgs) -> Result<Self, Self::Error> {
        let seed_path = args.seed_path.ok_or(CliError::MissingArgument {
            field: ARG_SEED_PATH,
            env: ENV_SEED_PATH,
        })?;
        Ok(Self {
            seed_path,
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
        })
    }
}
