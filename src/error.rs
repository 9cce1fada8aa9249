// src/error.rs
use thiserror::Error;

use crate::config::Period;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown spectral index '{0}' (expected one of NDVI, SAVI, EVI, GNDVI, LSWI, NDWI, MNDWI)")]
    UnknownIndexError(String),

    /// Broken sensor band table. This is a code defect, never bad input.
    #[error("sensor table error: {0}")]
    SensorTableError(String),

    #[error("imagery service error: {0}")]
    RemoteServiceError(String),

    #[error("reduction would process {pixels} pixels, budget is {max_pixels}")]
    ReductionLimitExceeded { pixels: u64, max_pixels: u64 },

    #[error("series has no values to classify")]
    EmptySeriesError,

    #[error("no qualifying scenes in {collection} for {year} ({period})")]
    NoImageryError {
        collection: String,
        year: i32,
        period: Period,
    },

    #[error("band {band} missing from composite (available: {available})")]
    MissingBandError { band: String, available: String },

    #[error("invalid year range {start}..={end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("study region error: {0}")]
    RegionError(String),

    #[error("IO error {0}")]
    IOError(#[from] std::io::Error),

    #[error("serde error {0}")]
    SerdeError(#[from] serde_json::Error),

    #[cfg(feature = "gdal")]
    #[error("gdal error {0}")]
    GdalError(#[from] gdal::errors::GdalError),
}

pub fn remote_service(msg: impl ToString) -> Error {
    Error::RemoteServiceError(msg.to_string())
}

pub fn region_error(msg: impl ToString) -> Error {
    Error::RegionError(msg.to_string())
}
