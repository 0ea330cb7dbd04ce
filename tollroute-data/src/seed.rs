//! POI seed documents.
//!
//! A seed is a JSON object with optional `tolls`, `toll_tags`,
//! `weigh_stations`, `fuel_stations` and `freight_loads` arrays, in the row
//! shapes of [`PoiSeed`]. The CLI loads one into the SQLite store.

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use thiserror::Error;
use tollroute_core::store::PoiSeed;

/// Errors raised while reading a seed document.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The file could not be read.
    #[error("failed to read seed {path}: {source}")]
    Read {
        /// Seed path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid seed document.
    #[error("invalid seed {path}: {source}")]
    Parse {
        /// Seed path.
        path: Utf8PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

/// Read and parse the seed at `path`.
///
/// # Errors
///
/// Returns [`SeedError::Read`] when the file cannot be read and
/// [`SeedError::Parse`] when it is not a seed document.
pub fn load_seed(path: &Utf8Path) -> Result<PoiSeed, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let seed: PoiSeed = serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "seed {path}: {} tolls, {} tags, {} weigh stations, {} fuel stations, {} freight rows",
        seed.tolls.len(),
        seed.toll_tags.len(),
        seed.weigh_stations.len(),
        seed.fuel_stations.len(),
        seed.freight_loads.len()
    );
    Ok(seed)
}
