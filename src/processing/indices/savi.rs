// src/processing/indices/savi.rs
use crate::processing::indices::IndexCalculator;
use crate::sensor::StandardBand;
use crate::utils::raster::BandValues;

/// Soil brightness correction used by the dashboard maps
pub const DEFAULT_SOIL_FACTOR: f64 = 0.5;

/// Soil Adjusted Vegetation Index (SAVI) calculator
pub struct SAVI {
    soil_factor: f64,
    name: String,
}

impl SAVI {
    pub fn new(soil_factor: f64, name: Option<String>) -> Self {
        Self {
            soil_factor,
            name: name.unwrap_or_else(|| "SAVI".to_string()),
        }
    }
}

impl IndexCalculator for SAVI {
    fn evaluate(&self, px: &BandValues) -> Option<f64> {
        // SAVI = ((NIR - RED) / (NIR + RED + L)) * (1 + L)
        let l = self.soil_factor;
        let denominator = px.nir + px.red + l;
        if denominator == 0.0 {
            return None;
        }
        Some((px.nir - px.red) / denominator * (1.0 + l))
    }

    fn required_bands(&self) -> &[StandardBand] {
        &[StandardBand::Nir, StandardBand::Red]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
