// src/service.rs
//! Boundary to the imagery archive: scene filtering and median compositing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DateRange;
use crate::error::Result;
use crate::processing::composite::median_composite;
use crate::region::StudyRegion;
use crate::utils::raster::MultiBandRaster;

/// Filter applied to a scene collection before compositing
#[derive(Debug, Clone, Copy)]
pub struct CollectionQuery<'a> {
    pub collection_id: &'a str,
    pub date_range: DateRange,
    pub region: &'a StudyRegion,
    /// Scenes must have strictly less cloud cover than this percentage
    pub cloud_cover_threshold: f64,
}

/// Descriptive record of one archived scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMeta {
    pub collection: String,
    pub date: NaiveDate,
    pub cloud_cover: f64,
    /// Footprint [min_x, min_y, max_x, max_y], in `crs`
    pub bbox: [f64; 4],
    /// Raster projection; empty when unknown
    #[serde(default)]
    pub crs: String,
}

impl SceneMeta {
    /// Collection, date and cloud filters, then the footprint test with the
    /// region moved into the scene's CRS
    pub fn matches(&self, query: &CollectionQuery<'_>) -> Result<bool> {
        if self.collection != query.collection_id
            || !query.date_range.contains(self.date)
            || self.cloud_cover >= query.cloud_cover_threshold
        {
            return Ok(false);
        }
        query.region.intersects_footprint(&self.bbox, &self.crs)
    }
}

/// Imagery archive consumed by the pipeline.
///
/// Calls are not retried here; failures surface as `RemoteServiceError`.
pub trait ImageryService {
    /// Number of scenes passing the query filter
    fn scene_count(&self, query: &CollectionQuery<'_>) -> Result<usize>;

    /// Per-pixel median of the filtered scenes, native band names
    fn median_composite(&self, query: &CollectionQuery<'_>) -> Result<MultiBandRaster>;
}

impl<T: ImageryService + ?Sized> ImageryService for &T {
    fn scene_count(&self, query: &CollectionQuery<'_>) -> Result<usize> {
        (**self).scene_count(query)
    }

    fn median_composite(&self, query: &CollectionQuery<'_>) -> Result<MultiBandRaster> {
        (**self).median_composite(query)
    }
}

/// Archive held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    scenes: Vec<(SceneMeta, MultiBandRaster)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scene; its footprint is taken from the raster grid
    pub fn add_scene(
        &mut self,
        collection: impl Into<String>,
        date: NaiveDate,
        cloud_cover: f64,
        raster: MultiBandRaster,
    ) {
        let meta = SceneMeta {
            collection: collection.into(),
            date,
            cloud_cover,
            bbox: raster.geo_info.bounds(raster.shape),
            crs: raster.geo_info.projection.clone(),
        };
        self.scenes.push((meta, raster));
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    fn matching<'s>(&'s self, query: &CollectionQuery<'_>) -> Result<Vec<&'s MultiBandRaster>> {
        let mut rasters = Vec::new();
        for (meta, raster) in &self.scenes {
            if meta.matches(query)? {
                rasters.push(raster);
            }
        }
        Ok(rasters)
    }
}

impl ImageryService for MemoryArchive {
    fn scene_count(&self, query: &CollectionQuery<'_>) -> Result<usize> {
        Ok(self.matching(query)?.len())
    }

    fn median_composite(&self, query: &CollectionQuery<'_>) -> Result<MultiBandRaster> {
        let scenes = self.matching(query)?;
        debug!(
            "compositing {} in-memory scenes of {}",
            scenes.len(),
            query.collection_id
        );
        median_composite(&scenes)
    }
}
