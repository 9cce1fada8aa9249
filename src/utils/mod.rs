// src/utils/mod.rs
pub mod cache;
pub mod fixed_point;
pub mod raster;
