// src/lib.rs
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
#[cfg(feature = "gdal")]
pub mod io;
pub mod processing;
pub mod region;
pub mod sensor;
pub mod service;
pub mod utils;

pub use error::{Error, Result};

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
