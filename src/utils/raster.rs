// src/utils/raster.rs
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::processing::indices::SpectralIndex;
use crate::sensor::StandardBand;

/// NoData value for floating point rasters
pub const NODATA: f32 = -999.0;

pub fn is_nodata(value: f32) -> bool {
    value == NODATA || !value.is_finite()
}

/// Georeferencing shared by every raster of one grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub projection: String,
    pub geo_transform: [f64; 6],
}

impl GeoInfo {
    pub fn new(projection: impl Into<String>, geo_transform: [f64; 6]) -> Self {
        Self {
            projection: projection.into(),
            geo_transform,
        }
    }

    /// Map coordinates of the center of pixel (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let gt = &self.geo_transform;
        let c = col as f64 + 0.5;
        let r = row as f64 + 0.5;
        (gt[0] + c * gt[1] + r * gt[2], gt[3] + c * gt[4] + r * gt[5])
    }

    /// Ground area covered by one pixel
    pub fn pixel_area(&self) -> f64 {
        let gt = &self.geo_transform;
        (gt[1] * gt[5] - gt[2] * gt[4]).abs()
    }

    /// Bounding box [min_x, min_y, max_x, max_y] of a grid with the given shape
    pub fn bounds(&self, shape: (usize, usize)) -> [f64; 4] {
        let gt = &self.geo_transform;
        let (w, h) = (shape.0 as f64, shape.1 as f64);
        let corners = [
            (gt[0], gt[3]),
            (gt[0] + w * gt[1], gt[3] + w * gt[4]),
            (gt[0] + h * gt[2], gt[3] + h * gt[5]),
            (gt[0] + w * gt[1] + h * gt[2], gt[3] + w * gt[4] + h * gt[5]),
        ];
        corners.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |b, &(x, y)| [b[0].min(x), b[1].min(y), b[2].max(x), b[3].max(y)],
        )
    }
}

/// A single named band of f32 samples
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBand {
    pub name: String,
    pub data: Vec<f32>,
}

/// Multi-band raster as returned by the imagery service (native band names)
#[derive(Debug, Clone, PartialEq)]
pub struct MultiBandRaster {
    pub shape: (usize, usize),
    pub geo_info: GeoInfo,
    pub bands: Vec<NamedBand>,
}

impl MultiBandRaster {
    pub fn new(shape: (usize, usize), geo_info: GeoInfo) -> Self {
        Self {
            shape,
            geo_info,
            bands: Vec::new(),
        }
    }

    /// Append a band, checking its length against the raster shape
    pub fn with_band(mut self, name: impl Into<String>, data: Vec<f32>) -> Result<Self> {
        let name = name.into();
        if data.len() != self.shape.0 * self.shape.1 {
            return Err(Error::RemoteServiceError(format!(
                "band {} has {} samples, expected {}x{}",
                name,
                data.len(),
                self.shape.0,
                self.shape.1
            )));
        }
        self.bands.push(NamedBand { name, data });
        Ok(self)
    }

    pub fn band(&self, name: &str) -> Option<&NamedBand> {
        self.bands.iter().find(|b| b.name == name)
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn pixel_count(&self) -> usize {
        self.shape.0 * self.shape.1
    }
}

/// Pixel values of the six standardized bands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandValues {
    pub blue: f64,
    pub green: f64,
    pub red: f64,
    pub nir: f64,
    pub swir1: f64,
    pub swir2: f64,
}

impl BandValues {
    pub fn get(&self, band: StandardBand) -> f64 {
        match band {
            StandardBand::Blue => self.blue,
            StandardBand::Green => self.green,
            StandardBand::Red => self.red,
            StandardBand::Nir => self.nir,
            StandardBand::Swir1 => self.swir1,
            StandardBand::Swir2 => self.swir2,
        }
    }
}

/// Raster relabelled to the standardized band vocabulary.
///
/// Bands are stored in `StandardBand::ALL` order, so the six-band layout
/// holds for every sensor generation.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedImage {
    pub shape: (usize, usize),
    pub geo_info: GeoInfo,
    bands: [Vec<f32>; 6],
}

impl StandardizedImage {
    pub fn new(shape: (usize, usize), geo_info: GeoInfo, bands: [Vec<f32>; 6]) -> Result<Self> {
        let expected = shape.0 * shape.1;
        if let Some((band, data)) = StandardBand::ALL
            .iter()
            .zip(bands.iter())
            .find(|(_, data)| data.len() != expected)
        {
            return Err(Error::RemoteServiceError(format!(
                "band {} has {} samples, expected {}",
                band,
                data.len(),
                expected
            )));
        }
        Ok(Self {
            shape,
            geo_info,
            bands,
        })
    }

    /// Build an image where every pixel carries the same band values
    pub fn uniform(shape: (usize, usize), geo_info: GeoInfo, values: BandValues) -> Self {
        let n = shape.0 * shape.1;
        let bands = StandardBand::ALL.map(|band| vec![values.get(band) as f32; n]);
        Self {
            shape,
            geo_info,
            bands,
        }
    }

    pub fn band(&self, band: StandardBand) -> &[f32] {
        &self.bands[band.position()]
    }

    pub fn band_names(&self) -> [&'static str; 6] {
        StandardBand::ALL.map(|b| b.name())
    }

    pub fn pixel_count(&self) -> usize {
        self.shape.0 * self.shape.1
    }

    /// Band values at pixel `i`; NoData samples are passed through as is
    pub fn values_at(&self, i: usize) -> BandValues {
        BandValues {
            blue: self.bands[0][i] as f64,
            green: self.bands[1][i] as f64,
            red: self.bands[2][i] as f64,
            nir: self.bands[3][i] as f64,
            swir1: self.bands[4][i] as f64,
            swir2: self.bands[5][i] as f64,
        }
    }

    /// True when any of `bands` is NoData at pixel `i`
    pub fn is_masked(&self, i: usize, bands: &[StandardBand]) -> bool {
        bands.iter().any(|b| is_nodata(self.band(*b)[i]))
    }
}

/// Single band result of an index computation
#[derive(Debug, Clone, PartialEq)]
pub struct IndexImage {
    pub index: SpectralIndex,
    pub shape: (usize, usize),
    pub geo_info: GeoInfo,
    pub data: Vec<f32>,
}

impl IndexImage {
    pub fn name(&self) -> &'static str {
        self.index.name()
    }

    /// Iterate over the samples that are not masked
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().copied().filter(|v| !is_nodata(*v))
    }

    pub fn valid_count(&self) -> usize {
        self.valid_values().count()
    }
}
