// src/region.rs
//! Study region geometry: loaded once per session from GeoJSON, then used
//! to filter scene footprints, mask pixels and clip index images.
//!
//! A region remembers the CRS its coordinates are in. Before it meets a
//! raster grid it is moved into the grid's CRS, so a lon/lat region over a
//! UTM scene compares metres with metres.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use geo::{BoundingRect, Contains, Geometry, MultiPolygon, Point, Polygon};
use geojson::{GeoJson, JsonObject};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{region_error, Result};
use crate::utils::raster::{GeoInfo, IndexImage, NODATA};

/// CRS of GeoJSON coordinates unless the document names another one
pub const GEOJSON_CRS: &str = "EPSG:4326";

/// Immutable polygon or multipolygon area of interest
#[derive(Debug, Clone, PartialEq)]
pub struct StudyRegion {
    shape: MultiPolygon<f64>,
    bbox: [f64; 4],
    /// `None` means "same CRS as whatever grid it is applied to"
    crs: Option<String>,
}

impl StudyRegion {
    pub fn new(polygons: Vec<Polygon<f64>>) -> Result<Self> {
        Self::from_parts(MultiPolygon::new(polygons), None)
    }

    fn from_parts(shape: MultiPolygon<f64>, crs: Option<String>) -> Result<Self> {
        if shape.0.is_empty() {
            return Err(region_error("region has no polygons"));
        }
        // rings are closed, so a triangle carries four positions
        if let Some(p) = shape.0.iter().find(|p| p.exterior().0.len() < 4) {
            return Err(region_error(format!(
                "polygon ring has {} distinct vertices, need at least 3",
                p.exterior().0.len().saturating_sub(1)
            )));
        }
        let rect = shape
            .bounding_rect()
            .ok_or_else(|| region_error("region has an empty extent"))?;
        let bbox = [rect.min().x, rect.min().y, rect.max().x, rect.max().y];
        if bbox.iter().any(|v| !v.is_finite()) {
            return Err(region_error("region has non finite coordinates"));
        }

        Ok(Self { shape, bbox, crs })
    }

    /// Axis aligned rectangle in the grid's own CRS, mostly useful for tests
    /// and quick looks
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let ring = vec![
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
            (min_x, min_y),
        ];
        Self::new(vec![Polygon::new(ring.into(), Vec::new())])
    }

    /// Tag the coordinates with a CRS (`EPSG:xxxx`, WKT or anything GDAL
    /// accepts as a user definition)
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let region = Self::from_geojson_str(&content)?;
        info!(
            "loaded study region {} ({} polygons, {})",
            path.as_ref().display(),
            region.shape.0.len(),
            region.crs().unwrap_or("grid CRS")
        );
        Ok(region)
    }

    /// Parse a GeoJSON Polygon, MultiPolygon, Feature or FeatureCollection.
    ///
    /// A collection becomes the union of its feature geometries. Coordinates
    /// are WGS84 lon/lat unless a legacy `crs` member names another CRS.
    pub fn from_geojson_str(content: &str) -> Result<Self> {
        let geojson: GeoJson = content
            .parse()
            .map_err(|e| region_error(format!("invalid GeoJSON: {e}")))?;

        let mut polygons = Vec::new();
        let crs = match geojson {
            GeoJson::FeatureCollection(collection) => {
                for feature in collection.features {
                    if let Some(geometry) = feature.geometry {
                        push_geojson(geometry, &mut polygons)?;
                    }
                }
                legacy_crs(collection.foreign_members.as_ref())
            }
            GeoJson::Feature(feature) => {
                let crs = legacy_crs(feature.foreign_members.as_ref());
                let geometry = feature
                    .geometry
                    .ok_or_else(|| region_error("Feature without geometry"))?;
                push_geojson(geometry, &mut polygons)?;
                crs
            }
            GeoJson::Geometry(geometry) => {
                let crs = legacy_crs(geometry.foreign_members.as_ref());
                push_geojson(geometry, &mut polygons)?;
                crs
            }
        };

        Self::from_parts(
            MultiPolygon::new(polygons),
            Some(crs.unwrap_or_else(|| GEOJSON_CRS.to_string())),
        )
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.shape.0
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    /// [min_x, min_y, max_x, max_y]
    pub fn bbox(&self) -> [f64; 4] {
        self.bbox
    }

    pub fn intersects_bbox(&self, other: &[f64; 4]) -> bool {
        let b = &self.bbox;
        b[0] <= other[2] && other[0] <= b[2] && b[1] <= other[3] && other[1] <= b[3]
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let b = &self.bbox;
        if x < b[0] || x > b[2] || y < b[1] || y > b[3] {
            return false;
        }
        self.shape.contains(&Point::new(x, y))
    }

    /// The region expressed in `projection`.
    ///
    /// Borrows when no move is needed: the region has no CRS, the grid has
    /// no projection, or both name the same CRS. A CRS that cannot be
    /// interpreted, or a transform that fails, is a `RegionError`.
    pub fn in_crs(&self, projection: &str) -> Result<Cow<'_, StudyRegion>> {
        let source = match self.crs.as_deref() {
            Some(crs) if !projection.is_empty() && crs != projection => crs,
            _ => return Ok(Cow::Borrowed(self)),
        };
        match reproject(&self.shape, source, projection)? {
            Some(shape) => {
                debug!("reprojected study region from {source}");
                Self::from_parts(shape, Some(projection.to_string())).map(Cow::Owned)
            }
            None => Ok(Cow::Borrowed(self)),
        }
    }

    /// Whether a footprint given in `projection` touches the region's bbox
    pub fn intersects_footprint(&self, bbox: &[f64; 4], projection: &str) -> Result<bool> {
        Ok(self.in_crs(projection)?.intersects_bbox(bbox))
    }

    /// Row-major mask of grid pixels whose centers fall inside the region
    pub fn mask(&self, shape: (usize, usize), geo_info: &GeoInfo) -> Result<Vec<bool>> {
        let region = self.in_crs(&geo_info.projection)?;
        let (width, height) = shape;
        let mut mask = vec![false; width * height];
        if width == 0 {
            return Ok(mask);
        }
        mask.par_chunks_mut(width).enumerate().for_each(|(row, cells)| {
            for (col, cell) in cells.iter_mut().enumerate() {
                let (x, y) = geo_info.pixel_center(col, row);
                *cell = region.contains(x, y);
            }
        });
        Ok(mask)
    }

    /// Mask out every pixel outside the region
    pub fn clip(&self, mut image: IndexImage) -> Result<IndexImage> {
        let mask = self.mask(image.shape, &image.geo_info)?;
        image
            .data
            .par_iter_mut()
            .zip(mask.par_iter())
            .filter(|(_, inside)| !**inside)
            .for_each(|(value, _)| *value = NODATA);
        Ok(image)
    }
}

fn push_geojson(geometry: geojson::Geometry, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    let geometry = Geometry::<f64>::try_from(geometry)
        .map_err(|e| region_error(format!("invalid geometry: {e}")))?;
    push_polygons(geometry, out)
}

fn push_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    match geometry {
        Geometry::Polygon(polygon) => out.push(polygon),
        Geometry::MultiPolygon(parts) => out.extend(parts),
        Geometry::Rect(rect) => out.push(rect.to_polygon()),
        Geometry::Triangle(triangle) => out.push(triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            for geometry in collection {
                push_polygons(geometry, out)?;
            }
        }
        _ => return Err(region_error("only polygonal geometries can form a region")),
    }
    Ok(())
}

// pre RFC 7946 documents: {"crs": {"type": "name", "properties": {"name": ...}}}
fn legacy_crs(members: Option<&JsonObject>) -> Option<String> {
    members?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

#[cfg(feature = "gdal")]
fn reproject(shape: &MultiPolygon<f64>, from: &str, to: &str) -> Result<Option<MultiPolygon<f64>>> {
    use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
    use geo::{Coord, MapCoords};

    let spatial_ref = |definition: &str| -> Result<SpatialRef> {
        let mut srs = SpatialRef::from_definition(definition).map_err(|e| {
            let head: String = definition.chars().take(64).collect();
            region_error(format!("cannot interpret CRS '{head}': {e}"))
        })?;
        // x = easting/longitude on both sides
        srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Ok(srs)
    };
    let source = spatial_ref(from)?;
    let target = spatial_ref(to)?;
    if source == target {
        return Ok(None);
    }

    let transform = CoordTransform::new(&source, &target)
        .map_err(|e| region_error(format!("no transform from {from} to the raster CRS: {e}")))?;
    let transform = &transform;
    shape
        .try_map_coords(|coord: Coord<f64>| -> Result<Coord<f64>> {
            let (mut xs, mut ys, mut zs) = ([coord.x], [coord.y], [0.0]);
            transform
                .transform_coords(&mut xs, &mut ys, &mut zs)
                .map_err(|e| region_error(format!("cannot reproject ({}, {}): {e}", coord.x, coord.y)))?;
            Ok(Coord { x: xs[0], y: ys[0] })
        })
        .map(Some)
}

#[cfg(not(feature = "gdal"))]
fn reproject(_shape: &MultiPolygon<f64>, from: &str, _to: &str) -> Result<Option<MultiPolygon<f64>>> {
    Err(region_error(format!(
        "region is in {from} but the raster uses another CRS; reprojection needs the gdal feature"
    )))
}
