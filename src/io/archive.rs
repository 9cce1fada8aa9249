// src/io/archive.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{remote_service, Result};
use crate::io::reader::{read_footprint, read_scene};
use crate::processing::composite::median_composite;
use crate::service::{CollectionQuery, ImageryService, SceneMeta};
use crate::utils::raster::MultiBandRaster;

/// One scene entry of a catalog file
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogScene {
    pub collection: String,
    pub date: NaiveDate,
    pub cloud_cover: f64,
    /// GeoTIFF path, relative to the catalog file
    pub path: PathBuf,
    /// Footprint, read from the raster when absent
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    /// CRS of `bbox`, read from the raster when absent
    #[serde(default)]
    pub crs: Option<String>,
    /// Native band names, overriding band descriptions
    #[serde(default)]
    pub bands: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    scenes: Vec<CatalogScene>,
}

struct ArchivedScene {
    meta: SceneMeta,
    path: PathBuf,
    bands: Option<Vec<String>>,
}

/// Scene archive on local disk, described by a JSON catalog
pub struct LocalArchive {
    scenes: Vec<ArchivedScene>,
}

impl LocalArchive {
    pub fn open<P: AsRef<Path>>(catalog_path: P) -> Result<Self> {
        let catalog_path = catalog_path.as_ref();
        let content = fs::read_to_string(catalog_path)?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        let root = catalog_path.parent().unwrap_or_else(|| Path::new("."));

        let scenes = catalog
            .scenes
            .into_iter()
            .map(|scene| -> Result<ArchivedScene> {
                let path = root.join(&scene.path);
                let (bbox, crs) = match (scene.bbox, scene.crs) {
                    (Some(bbox), Some(crs)) => (bbox, crs),
                    (bbox, _) => {
                        let (bounds, projection) = read_footprint(&path)?;
                        (bbox.unwrap_or(bounds), projection)
                    }
                };
                Ok(ArchivedScene {
                    meta: SceneMeta {
                        collection: scene.collection,
                        date: scene.date,
                        cloud_cover: scene.cloud_cover,
                        bbox,
                        crs,
                    },
                    path,
                    bands: scene.bands,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("opened catalog {} ({} scenes)", catalog_path.display(), scenes.len());
        Ok(Self { scenes })
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    fn matching<'s>(&'s self, query: &CollectionQuery<'_>) -> Result<Vec<&'s ArchivedScene>> {
        let mut scenes = Vec::new();
        for scene in &self.scenes {
            if scene.meta.matches(query)? {
                scenes.push(scene);
            }
        }
        Ok(scenes)
    }
}

impl ImageryService for LocalArchive {
    fn scene_count(&self, query: &CollectionQuery<'_>) -> Result<usize> {
        Ok(self.matching(query)?.len())
    }

    fn median_composite(&self, query: &CollectionQuery<'_>) -> Result<MultiBandRaster> {
        let rasters = self
            .matching(query)?
            .into_iter()
            .map(|scene| {
                read_scene(&scene.path, scene.bands.as_deref())
                    .map_err(|e| remote_service(format!("{}: {}", scene.path.display(), e)))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("compositing {} scenes of {}", rasters.len(), query.collection_id);
        let refs: Vec<&MultiBandRaster> = rasters.iter().collect();
        median_composite(&refs)
    }
}
