// src/io/reader.rs
use std::path::Path;

use gdal::{Dataset, Metadata};
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::raster::{GeoInfo, MultiBandRaster, NODATA};

pub fn read_geo_info(dataset: &Dataset) -> Result<GeoInfo> {
    Ok(GeoInfo::new(dataset.projection(), dataset.geo_transform()?))
}

/// Footprint [min_x, min_y, max_x, max_y] of a raster file and the
/// projection it is expressed in
pub fn read_footprint<P: AsRef<Path>>(path: P) -> Result<([f64; 4], String)> {
    let dataset = Dataset::open(path.as_ref())?;
    let geo_info = read_geo_info(&dataset)?;
    Ok((geo_info.bounds(dataset.raster_size()), geo_info.projection))
}

/// Read every band of a multi-band scene.
///
/// Band names come from `band_names` when given, otherwise from the band
/// descriptions. Source NoData samples are rewritten to `NODATA`.
pub fn read_scene<P: AsRef<Path>>(path: P, band_names: Option<&[String]>) -> Result<MultiBandRaster> {
    let path = path.as_ref();
    let dataset = Dataset::open(path)?;
    let (width, height) = dataset.raster_size();
    let band_count = dataset.raster_count() as usize;

    if let Some(names) = band_names {
        if names.len() != band_count {
            return Err(Error::RemoteServiceError(format!(
                "{}: catalog lists {} band names for {} bands",
                path.display(),
                names.len(),
                band_count
            )));
        }
    }

    let mut raster = MultiBandRaster::new((width, height), read_geo_info(&dataset)?);
    for i in 1..=band_count {
        let band = dataset.rasterband(i)?;
        let name = match band_names {
            Some(names) => names[i - 1].clone(),
            None => band.description()?,
        };
        if name.is_empty() {
            return Err(Error::RemoteServiceError(format!(
                "{}: band {} has no description and no catalog name",
                path.display(),
                i
            )));
        }

        let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
        let mut data = buffer.data().to_vec();
        if let Some(nodata) = band.no_data_value() {
            for value in data.iter_mut().filter(|v| **v as f64 == nodata) {
                *value = NODATA;
            }
        }
        raster = raster.with_band(name, data)?;
    }

    debug!(
        "read {} ({}x{}, bands {:?})",
        path.display(),
        width,
        height,
        raster.band_names()
    );
    Ok(raster)
}
