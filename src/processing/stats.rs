// src/processing/stats.rs
use std::collections::BTreeMap;

use itertools::{Itertools, MinMaxResult};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::processing::indices::SpectralIndex;
use crate::region::StudyRegion;
use crate::utils::raster::{is_nodata, IndexImage};

/// Resolution and cost bound of a region reduction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReduceParams {
    /// Map units per pixel of the reduction grid. Only the pixel budget is
    /// measured on this grid; values are read at the image's own resolution.
    pub scale: f64,
    pub max_pixels: u64,
}

impl From<&PipelineConfig> for ReduceParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            scale: config.scale,
            max_pixels: config.max_pixels,
        }
    }
}

impl Default for ReduceParams {
    fn default() -> Self {
        (&PipelineConfig::default()).into()
    }
}

/// Mean, min and max of an index over the region; None when fully masked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub index: SpectralIndex,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub valid_pixels: usize,
}

impl IndexStats {
    /// Keys are the index name suffixed with `_mean`, `_min` and `_max`
    pub fn to_map(&self) -> BTreeMap<String, Option<f64>> {
        let name = self.index.name();
        BTreeMap::from([
            (format!("{name}_mean"), self.mean),
            (format!("{name}_min"), self.min),
            (format!("{name}_max"), self.max),
        ])
    }
}

/// Number of reduction-grid pixels covered by `region_pixels` raster pixels
fn reduction_pixels(region_pixels: usize, pixel_area: f64, scale: f64) -> u64 {
    let ratio = if pixel_area > 0.0 && scale > 0.0 {
        pixel_area / (scale * scale)
    } else {
        1.0
    };
    (region_pixels as f64 * ratio).ceil() as u64
}

/// Mean, min and max of the unmasked pixels whose centers lie in `region`.
///
/// The reduction runs on the image's native grid, which is assumed to match
/// `params.scale` (30 m for every Landsat collection used here). A different
/// `scale` changes the pixel budget estimate and nothing else; no resampling
/// happens.
pub fn reduce_stats(
    image: &IndexImage,
    region: &StudyRegion,
    params: &ReduceParams,
) -> Result<IndexStats> {
    let native = image.geo_info.pixel_area().sqrt();
    if (native - params.scale).abs() > 1e-9 {
        debug!(
            "reducing at native {:.3} map units, budget measured at scale {}",
            native, params.scale
        );
    }

    let mask = region.mask(image.shape, &image.geo_info)?;
    let region_pixels = mask.par_iter().filter(|inside| **inside).count();

    let pixels = reduction_pixels(region_pixels, image.geo_info.pixel_area(), params.scale);
    if pixels > params.max_pixels {
        return Err(Error::ReductionLimitExceeded {
            pixels,
            max_pixels: params.max_pixels,
        });
    }

    let values: Vec<f64> = image
        .data
        .par_iter()
        .zip(mask.par_iter())
        .filter(|(value, inside)| **inside && !is_nodata(**value))
        .map(|(value, _)| *value as f64)
        .collect();

    let (min, max) = match values.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => (None, None),
        MinMaxResult::OneElement(v) => (Some(v), Some(v)),
        MinMaxResult::MinMax(lo, hi) => (Some(lo), Some(hi)),
    };
    let mean = if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    };

    Ok(IndexStats {
        index: image.index,
        mean,
        min,
        max,
        valid_pixels: values.len(),
    })
}
