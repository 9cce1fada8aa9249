// src/processing/indices/evi.rs
use crate::processing::indices::IndexCalculator;
use crate::sensor::StandardBand;
use crate::utils::raster::BandValues;

// EVI coefficients from MODIS documentation
const G: f64 = 2.5; // Gain factor
const L: f64 = 1.0; // Canopy background adjustment
const C1: f64 = 6.0; // Aerosol resistance (red)
const C2: f64 = 7.5; // Aerosol resistance (blue)

/// Enhanced Vegetation Index (EVI) calculator
pub struct EVI {
    name: String,
}

impl EVI {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_else(|| "EVI".to_string()),
        }
    }
}

impl IndexCalculator for EVI {
    fn evaluate(&self, px: &BandValues) -> Option<f64> {
        let denominator = px.nir + C1 * px.red - C2 * px.blue + L;
        if denominator == 0.0 {
            return None;
        }
        Some(G * (px.nir - px.red) / denominator)
    }

    fn required_bands(&self) -> &[StandardBand] {
        &[StandardBand::Nir, StandardBand::Red, StandardBand::Blue]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
