// src/processing/indices/mod.rs
pub mod ndi;
pub mod evi;
pub mod savi;

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sensor::StandardBand;
use crate::utils::raster::{BandValues, IndexImage, StandardizedImage, NODATA};

// Re-export indices
pub use ndi::NDI;
pub use evi::EVI;
pub use savi::SAVI;

/// Trait for spectral index calculators
pub trait IndexCalculator: Send + Sync {
    /// Index value for one pixel, None where the formula is undefined
    fn evaluate(&self, px: &BandValues) -> Option<f64>;

    /// Standardized bands read by the formula
    fn required_bands(&self) -> &[StandardBand];

    /// Return the name of the index
    fn name(&self) -> &str;

    /// Apply the formula to every pixel. Masked inputs, zero denominators
    /// and non-finite results all come out as NODATA.
    fn calculate(&self, image: &StandardizedImage) -> Vec<f32> {
        let required = self.required_bands();
        let mut result_data = vec![NODATA; image.pixel_count()];

        result_data.par_iter_mut().enumerate().for_each(|(i, result)| {
            if image.is_masked(i, required) {
                return;
            }
            if let Some(value) = self.evaluate(&image.values_at(i)) {
                let value = value as f32;
                if value.is_finite() {
                    *result = value;
                }
            }
        });

        result_data
    }
}

/// Map rendering range and palette for one index
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisParams {
    pub min: f64,
    pub max: f64,
    pub palette: &'static [&'static str],
}

const VEGETATION_VIS: VisParams = VisParams {
    min: -0.2,
    max: 0.9,
    palette: &["brown", "yellow", "green"],
};

/// The closed set of indices offered by the dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SpectralIndex {
    NDVI,
    SAVI,
    EVI,
    GNDVI,
    LSWI,
    NDWI,
    MNDWI,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 7] = [
        SpectralIndex::NDVI,
        SpectralIndex::SAVI,
        SpectralIndex::EVI,
        SpectralIndex::GNDVI,
        SpectralIndex::LSWI,
        SpectralIndex::NDWI,
        SpectralIndex::MNDWI,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpectralIndex::NDVI => "NDVI",
            SpectralIndex::SAVI => "SAVI",
            SpectralIndex::EVI => "EVI",
            SpectralIndex::GNDVI => "GNDVI",
            SpectralIndex::LSWI => "LSWI",
            SpectralIndex::NDWI => "NDWI",
            SpectralIndex::MNDWI => "MNDWI",
        }
    }

    pub fn formula(self) -> &'static str {
        match self {
            SpectralIndex::NDVI => "(NIR - RED) / (NIR + RED)",
            SpectralIndex::SAVI => "(NIR - RED) / (NIR + RED + 0.5) * 1.5",
            SpectralIndex::EVI => "2.5 * (NIR - RED) / (NIR + 6 * RED - 7.5 * BLUE + 1)",
            SpectralIndex::GNDVI => "(NIR - GREEN) / (NIR + GREEN)",
            SpectralIndex::LSWI => "(NIR - SWIR1) / (NIR + SWIR1)",
            SpectralIndex::NDWI => "(GREEN - NIR) / (GREEN + NIR)",
            SpectralIndex::MNDWI => "(GREEN - SWIR1) / (GREEN + SWIR1)",
        }
    }

    pub fn calculator(self) -> Box<dyn IndexCalculator> {
        let name = Some(self.name().to_string());
        match self {
            SpectralIndex::NDVI => Box::new(NDI::new(StandardBand::Nir, StandardBand::Red, name)),
            SpectralIndex::SAVI => Box::new(SAVI::new(savi::DEFAULT_SOIL_FACTOR, name)),
            SpectralIndex::EVI => Box::new(EVI::new(name)),
            SpectralIndex::GNDVI => Box::new(NDI::new(StandardBand::Nir, StandardBand::Green, name)),
            SpectralIndex::LSWI => Box::new(NDI::new(StandardBand::Nir, StandardBand::Swir1, name)),
            SpectralIndex::NDWI => Box::new(NDI::new(StandardBand::Green, StandardBand::Nir, name)),
            SpectralIndex::MNDWI => Box::new(NDI::new(StandardBand::Green, StandardBand::Swir1, name)),
        }
    }

    /// Index value for a single set of band values
    pub fn evaluate(self, px: &BandValues) -> Option<f64> {
        self.calculator().evaluate(px)
    }

    pub fn vis_params(self) -> VisParams {
        match self {
            SpectralIndex::NDVI | SpectralIndex::SAVI | SpectralIndex::EVI | SpectralIndex::GNDVI => {
                VEGETATION_VIS
            }
            SpectralIndex::LSWI => VisParams {
                min: -0.5,
                max: 0.8,
                palette: &["brown", "white", "blue"],
            },
            SpectralIndex::NDWI => VisParams {
                min: -0.5,
                max: 0.8,
                palette: &["white", "cyan", "blue"],
            },
            SpectralIndex::MNDWI => VisParams {
                min: -0.5,
                max: 0.8,
                palette: &["white", "lightblue", "darkblue"],
            },
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SpectralIndex::ALL
            .into_iter()
            .find(|index| index.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownIndexError(s.to_string()))
    }
}

impl TryFrom<String> for SpectralIndex {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SpectralIndex> for String {
    fn from(index: SpectralIndex) -> Self {
        index.name().to_string()
    }
}

/// Derive the single band index image from standardized bands
pub fn compute_index(image: &StandardizedImage, index: SpectralIndex) -> IndexImage {
    let data = index.calculator().calculate(image);
    IndexImage {
        index,
        shape: image.shape,
        geo_info: image.geo_info.clone(),
        data,
    }
}

/// `compute_index` for an index given by name; unknown names are an error
pub fn compute_index_named(image: &StandardizedImage, index_name: &str) -> Result<IndexImage> {
    let index: SpectralIndex = index_name.parse()?;
    Ok(compute_index(image, index))
}
