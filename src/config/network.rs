//! Facility/lane/shipment reference-data fixture loaders.
//!
//! File format and location are external collaborators (spec.md §6);
//! Hardstop only needs the parsed shape, so these loaders are deliberately
//! thin wrappers over the `csv` crate rather than a bespoke format.

use std::path::Path;

use crate::config::ConfigError;
use crate::models::{Facility, Lane, Shipment};

pub fn load_facilities_csv(path: impl AsRef<Path>) -> Result<Vec<Facility>, ConfigError> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.as_ref().display())))?;
    reader
        .deserialize()
        .collect::<Result<Vec<Facility>, csv::Error>>()
        .map_err(|e| ConfigError::Parse(e.to_string()))
}

pub fn load_lanes_csv(path: impl AsRef<Path>) -> Result<Vec<Lane>, ConfigError> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.as_ref().display())))?;
    reader
        .deserialize()
        .collect::<Result<Vec<Lane>, csv::Error>>()
        .map_err(|e| ConfigError::Parse(e.to_string()))
}

pub fn load_shipments_csv(path: impl AsRef<Path>) -> Result<Vec<Shipment>, ConfigError> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.as_ref().display())))?;
    reader
        .deserialize()
        .collect::<Result<Vec<Shipment>, csv::Error>>()
        .map_err(|e| ConfigError::Parse(e.to_string()))
}
