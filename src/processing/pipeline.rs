// src/processing/pipeline.rs
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Period, PipelineConfig, RequestContext};
use crate::error::{Error, Result};
use crate::processing::indices::{compute_index, SpectralIndex};
use crate::processing::stats::{reduce_stats, IndexStats, ReduceParams};
use crate::region::StudyRegion;
use crate::sensor::{select_sensor, standardize};
use crate::service::{CollectionQuery, ImageryService};
use crate::utils::cache::{CacheKey, IndexCache};
use crate::utils::raster::{IndexImage, StandardizedImage};

/// Statistics of one year in a multi-year comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearStats {
    pub year: i32,
    pub stats: Option<IndexStats>,
    /// Failure message when this year could not be produced
    pub error: Option<String>,
}

/// Composite-image pipeline bound to one imagery service and study region.
///
/// Every request goes through one sequential round-trip to the service;
/// index images can be memoized by `(year, index, period)`.
pub struct IndexPipeline<S: ImageryService> {
    service: S,
    region: Arc<StudyRegion>,
    config: PipelineConfig,
    cache: Option<Arc<IndexCache>>,
}

impl<S: ImageryService> IndexPipeline<S> {
    pub fn new(service: S, region: Arc<StudyRegion>, config: PipelineConfig) -> Self {
        Self {
            service,
            region,
            config,
            cache: None,
        }
    }

    pub fn with_cache(
        service: S,
        region: Arc<StudyRegion>,
        config: PipelineConfig,
        cache: Arc<IndexCache>,
    ) -> Self {
        Self {
            service,
            region,
            config,
            cache: Some(cache),
        }
    }

    pub fn region(&self) -> &StudyRegion {
        &self.region
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache_size(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.len())
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Standardized median composite for a year and period, None when the
    /// filtered collection is empty
    pub fn composite(&self, year: i32, period: Period) -> Result<Option<StandardizedImage>> {
        let generation = select_sensor(year);
        let query = CollectionQuery {
            collection_id: generation.collection_id(),
            date_range: period.date_range(year)?,
            region: &self.region,
            cloud_cover_threshold: self.config.cloud_cover_threshold,
        };

        let scenes = self.service.scene_count(&query)?;
        debug!(
            "{} {} {}: {} scenes below {}% cloud cover",
            generation, year, period, scenes, self.config.cloud_cover_threshold
        );
        if scenes == 0 {
            return Ok(None);
        }

        let raster = self.service.median_composite(&query)?;
        Ok(Some(standardize(&raster, generation)?))
    }

    fn build_index(&self, year: i32, period: Period, index: SpectralIndex) -> Result<Option<IndexImage>> {
        let image = match self.composite(year, period)? {
            Some(image) => image,
            None => return Ok(None),
        };
        self.region.clip(compute_index(&image, index)).map(Some)
    }

    /// Index image for a year and period, clipped to the study region.
    ///
    /// An empty collection is a `NoImageryError` here; the yearly series
    /// turns it into a missing value instead.
    pub fn compute_index(&self, year: i32, period: Period, index: SpectralIndex) -> Result<Arc<IndexImage>> {
        let no_imagery = || Error::NoImageryError {
            collection: select_sensor(year).collection_id().to_string(),
            year,
            period,
        };
        let compute = || -> Result<IndexImage> {
            self.build_index(year, period, index)?.ok_or_else(no_imagery)
        };

        let image = match &self.cache {
            Some(cache) => cache.get_or_try_insert_with(CacheKey { year, index, period }, compute)?,
            None => Arc::new(compute()?),
        };
        info!("{} {} {}: {} valid pixels", index, year, period, image.valid_count());
        Ok(image)
    }

    /// Like `compute_index`, but an empty collection yields None
    pub fn try_compute_index(
        &self,
        year: i32,
        period: Period,
        index: SpectralIndex,
    ) -> Result<Option<Arc<IndexImage>>> {
        match self.compute_index(year, period, index) {
            Ok(image) => Ok(Some(image)),
            Err(Error::NoImageryError { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn reduce_params(&self) -> ReduceParams {
        (&self.config).into()
    }

    /// Region statistics of an index image
    pub fn reduce_stats(&self, image: &IndexImage) -> Result<IndexStats> {
        reduce_stats(image, &self.region, &self.reduce_params())
    }

    /// Region statistics for a year and period
    pub fn stats(&self, year: i32, period: Period, index: SpectralIndex) -> Result<IndexStats> {
        let image = self.compute_index(year, period, index)?;
        self.reduce_stats(&image)
    }

    /// Statistics for each requested year, in request order.
    ///
    /// A failing year is reported in its own entry and does not stop the others.
    pub fn compare(&self, ctx: &RequestContext) -> Vec<YearStats> {
        ctx.years
            .iter()
            .map(|&year| match self.stats(year, ctx.period, ctx.index) {
                Ok(stats) => YearStats {
                    year,
                    stats: Some(stats),
                    error: None,
                },
                Err(e) => {
                    warn!("{} {} {} failed: {}", ctx.index, year, ctx.period, e);
                    YearStats {
                        year,
                        stats: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }
}
