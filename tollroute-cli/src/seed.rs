//! `tollroute seed`: load POI tables into the SQLite store.

use std::io::Write;

use log::info;
use tollroute_core::{SqliteRouteStore, StoreError};
use tollroute_data::seed::load_seed;

use crate::CliError;
use crate::config::SeedArgs;

pub(crate) fn run_seed(args: SeedArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_seed_with(args, &mut stdout)
}

pub(crate) fn run_seed_with(args: SeedArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let seed = load_seed(&config.seed_path)?;
    let store_error = |source: StoreError| CliError::Store {
        path: config.database.clone(),
        source,
    };
    let store = SqliteRouteStore::open(config.database.as_std_path()).map_err(store_error)?;
    store.seed(&seed).map_err(store_error)?;
    info!("seeded {} from {}", config.database, config.seed_path);
    writeln!(
        writer,
        "tolls: {}\ntoll tags: {}\nweigh stations: {}\nfuel stations: {}\nfreight loads: {}",
        seed.tolls.len(),
        seed.toll_tags.len(),
        seed.weigh_stations.len(),
        seed.fuel_stations.len(),
        seed.freight_loads.len()
    )
    .map_err(CliError::WriteOutput)
}
