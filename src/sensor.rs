// src/sensor.rs
//! Landsat sensor generations and their mapping onto the standardized
//! band vocabulary (BLUE, GREEN, RED, NIR, SWIR1, SWIR2).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::raster::{MultiBandRaster, StandardizedImage};

/// Last year served by the Thematic Mapper archive
pub const LEGACY_LAST_YEAR: i32 = 2011;

/// Sensor-agnostic spectral channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StandardBand {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
}

impl StandardBand {
    /// Fixed order of the standardized bands
    pub const ALL: [StandardBand; 6] = [
        StandardBand::Blue,
        StandardBand::Green,
        StandardBand::Red,
        StandardBand::Nir,
        StandardBand::Swir1,
        StandardBand::Swir2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StandardBand::Blue => "BLUE",
            StandardBand::Green => "GREEN",
            StandardBand::Red => "RED",
            StandardBand::Nir => "NIR",
            StandardBand::Swir1 => "SWIR1",
            StandardBand::Swir2 => "SWIR2",
        }
    }

    pub fn position(self) -> usize {
        match self {
            StandardBand::Blue => 0,
            StandardBand::Green => 1,
            StandardBand::Red => 2,
            StandardBand::Nir => 3,
            StandardBand::Swir1 => 4,
            StandardBand::Swir2 => 5,
        }
    }
}

impl fmt::Display for StandardBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collection id plus native band codes listed in standardized order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSpec {
    pub collection_id: &'static str,
    pub native_bands: &'static [&'static str],
}

const LANDSAT5_TM: SensorSpec = SensorSpec {
    collection_id: "LANDSAT/LT05/C02/T1_L2",
    native_bands: &["SR_B1", "SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B7"],
};

const LANDSAT8_OLI: SensorSpec = SensorSpec {
    collection_id: "LANDSAT/LC08/C02/T1_L2",
    native_bands: &["SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B6", "SR_B7"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorGeneration {
    /// Landsat 5 TM, years up to 2011
    Legacy,
    /// Landsat 8 OLI, years after 2011
    Modern,
}

impl SensorGeneration {
    pub fn spec(self) -> &'static SensorSpec {
        match self {
            SensorGeneration::Legacy => &LANDSAT5_TM,
            SensorGeneration::Modern => &LANDSAT8_OLI,
        }
    }

    pub fn collection_id(self) -> &'static str {
        self.spec().collection_id
    }

    pub fn native_bands(self) -> &'static [&'static str] {
        self.spec().native_bands
    }
}

impl fmt::Display for SensorGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorGeneration::Legacy => write!(f, "Landsat 5 TM"),
            SensorGeneration::Modern => write!(f, "Landsat 8 OLI"),
        }
    }
}

pub fn select_sensor(year: i32) -> SensorGeneration {
    if year <= LEGACY_LAST_YEAR {
        SensorGeneration::Legacy
    } else {
        SensorGeneration::Modern
    }
}

/// Select the generation's native bands and relabel them to the standardized names
pub fn standardize(image: &MultiBandRaster, generation: SensorGeneration) -> Result<StandardizedImage> {
    standardize_with(image, generation.spec())
}

/// Positional relabelling against an explicit sensor table entry.
///
/// A table whose native band list is not exactly six long is a
/// `SensorTableError`; a composite lacking one of the listed bands is a
/// `MissingBandError`.
pub fn standardize_with(image: &MultiBandRaster, spec: &SensorSpec) -> Result<StandardizedImage> {
    if spec.native_bands.len() != StandardBand::ALL.len() {
        return Err(Error::SensorTableError(format!(
            "{} lists {} native bands for {} standardized bands",
            spec.collection_id,
            spec.native_bands.len(),
            StandardBand::ALL.len()
        )));
    }

    let mut bands: [Vec<f32>; 6] = Default::default();
    for (slot, native) in bands.iter_mut().zip(spec.native_bands) {
        let band = image.band(native).ok_or_else(|| Error::MissingBandError {
            band: native.to_string(),
            available: image.band_names().join(", "),
        })?;
        *slot = band.data.clone();
    }

    StandardizedImage::new(image.shape, image.geo_info.clone(), bands)
}
