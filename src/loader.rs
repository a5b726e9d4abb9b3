use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::engine::TimeslotCatalog;
use crate::limits::MAX_CATALOG_TIMESLOTS;
use crate::model::Timeslot;
use crate::observability;

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    NotAnArray,
    Empty,
    TooMany(usize),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            LoadError::Json(e) => write!(f, "invalid catalog JSON: {e}"),
            LoadError::NotAnArray => write!(f, "catalog JSON root must be an array"),
            LoadError::Empty => write!(f, "no valid timeslots found"),
            LoadError::TooMany(n) => {
                write!(f, "catalog has {n} timeslots, limit is {MAX_CATALOG_TIMESLOTS}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Json(e) => Some(e),
            _ => None,
        }
    }
}

/// Parse a catalog document: a JSON array of timeslot objects. Entries that
/// do not parse are skipped with a warning.
pub fn parse_timeslots(json: &str) -> Result<Vec<Timeslot>, LoadError> {
    let root: Value = serde_json::from_str(json).map_err(LoadError::Json)?;
    let Some(entries) = root.as_array() else {
        return Err(LoadError::NotAnArray);
    };
    if entries.len() > MAX_CATALOG_TIMESLOTS {
        return Err(LoadError::TooMany(entries.len()));
    }

    let timeslots: Vec<Timeslot> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| match Timeslot::deserialize(entry) {
            Ok(mut ts) if !ts.id.trim().is_empty() => {
                ts.id = ts.id.trim().to_string();
                Some(ts)
            }
            Ok(_) => {
                warn!("skipping timeslot at index {i}: blank id");
                None
            }
            Err(e) => {
                warn!("skipping malformed timeslot at index {i}: {e}");
                None
            }
        })
        .collect();

    if timeslots.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(timeslots)
}

pub fn load_timeslots(path: &Path) -> Result<Vec<Timeslot>, LoadError> {
    let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_timeslots(&json)
}

/// Initial catalog load. A failed load leaves the catalog empty.
pub fn bootstrap(catalog: &dyn TimeslotCatalog, path: &Path) -> Result<usize, LoadError> {
    match load_timeslots(path) {
        Ok(timeslots) => {
            let count = install(catalog, timeslots);
            record_load(catalog, "ok");
            info!("loaded {count} timeslots from {}", path.display());
            Ok(count)
        }
        Err(e) => {
            error!("error loading timeslots from {}: {e}", path.display());
            catalog.replace(Vec::new());
            record_load(catalog, "error");
            Err(e)
        }
    }
}

/// Reload into an already-serving catalog. A failed reload keeps the
/// current catalog.
pub fn reload(catalog: &dyn TimeslotCatalog, path: &Path) -> Result<usize, LoadError> {
    match load_timeslots(path) {
        Ok(timeslots) => {
            let count = install(catalog, timeslots);
            record_load(catalog, "ok");
            info!("reloaded {count} timeslots from {}", path.display());
            Ok(count)
        }
        Err(e) => {
            warn!("catalog reload from {} failed, keeping current: {e}", path.display());
            record_load(catalog, "error");
            Err(e)
        }
    }
}

/// Swap `timeslots` in and return how many the catalog now holds. Later
/// entries win over earlier ones with the same id.
fn install(catalog: &dyn TimeslotCatalog, timeslots: Vec<Timeslot>) -> usize {
    let parsed = timeslots.len();
    catalog.replace(timeslots);
    let count = catalog.len();
    if count < parsed {
        warn!("{} duplicate timeslot ids collapsed", parsed - count);
    }
    count
}

fn record_load(catalog: &dyn TimeslotCatalog, result: &'static str) {
    metrics::counter!(observability::CATALOG_LOADS_TOTAL, "result" => result).increment(1);
    metrics::gauge!(observability::CATALOG_TIMESLOTS).set(catalog.len() as f64);
}
