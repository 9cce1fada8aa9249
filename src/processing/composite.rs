// src/processing/composite.rs
use rayon::prelude::*;

use crate::error::{remote_service, Result};
use crate::utils::raster::{is_nodata, MultiBandRaster, NamedBand, NODATA};

/// Median of the valid samples, NODATA when there are none
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return NODATA;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Per-pixel median across scenes that share one grid and band set.
///
/// NoData samples are ignored, a pixel with no valid sample stays NoData.
pub fn median_composite(scenes: &[&MultiBandRaster]) -> Result<MultiBandRaster> {
    let first = scenes
        .first()
        .ok_or_else(|| remote_service("cannot composite an empty collection"))?;

    for scene in &scenes[1..] {
        if scene.shape != first.shape || scene.geo_info != first.geo_info {
            return Err(remote_service(format!(
                "scene grid {:?} does not match collection grid {:?}",
                scene.shape, first.shape
            )));
        }
    }

    let mut bands = Vec::with_capacity(first.bands.len());
    for band in &first.bands {
        let sources = scenes
            .iter()
            .map(|scene| {
                scene.band(&band.name).map(|b| b.data.as_slice()).ok_or_else(|| {
                    remote_service(format!("band {} missing from a scene", band.name))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut data = vec![NODATA; first.pixel_count()];
        data.par_iter_mut().enumerate().for_each_init(
            || Vec::with_capacity(sources.len()),
            |samples, (i, out)| {
                samples.clear();
                samples.extend(sources.iter().map(|s| s[i]).filter(|v| !is_nodata(*v)));
                *out = median(samples);
            },
        );

        bands.push(NamedBand {
            name: band.name.clone(),
            data,
        });
    }

    Ok(MultiBandRaster {
        shape: first.shape,
        geo_info: first.geo_info.clone(),
        bands,
    })
}
