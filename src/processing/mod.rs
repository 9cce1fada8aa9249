// src/processing/mod.rs
pub mod anomaly;
pub mod composite;
pub mod indices;
pub mod pipeline;
pub mod series;
pub mod stats;

// Re-export main components
pub use pipeline::IndexPipeline;
