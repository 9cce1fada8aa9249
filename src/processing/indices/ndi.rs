// src/processing/indices/ndi.rs
use crate::processing::indices::IndexCalculator;
use crate::sensor::StandardBand;
use crate::utils::raster::BandValues;

/// (a - b) / (a + b), undefined when the sum is zero
pub fn normalized_difference(a: f64, b: f64) -> Option<f64> {
    let sum = a + b;
    if sum == 0.0 {
        None
    } else {
        Some((a - b) / sum)
    }
}

/// Normalized Difference Index (NDI) calculator over two standardized bands.
///
/// NDVI, GNDVI, LSWI, NDWI and MNDWI are all instances of this form.
pub struct NDI {
    bands: [StandardBand; 2],
    name: String,
}

impl NDI {
    pub fn new(band_a: StandardBand, band_b: StandardBand, name: Option<String>) -> Self {
        Self {
            bands: [band_a, band_b],
            name: name.unwrap_or_else(|| "NDI".to_string()),
        }
    }
}

impl IndexCalculator for NDI {
    fn evaluate(&self, px: &BandValues) -> Option<f64> {
        normalized_difference(px.get(self.bands[0]), px.get(self.bands[1]))
    }

    fn required_bands(&self) -> &[StandardBand] {
        &self.bands
    }

    fn name(&self) -> &str {
        &self.name
    }
}
