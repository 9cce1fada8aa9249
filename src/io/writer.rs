// src/io/writer.rs
use std::path::Path;

use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{DriverManager, Metadata};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::utils::fixed_point::{to_fixed_point, FIXED_NODATA};
use crate::utils::raster::{IndexImage, NODATA};

/// GeoTIFF output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    pub use_fixed_point: bool,
    pub scale_factor: i32,
    pub compress: String,
    pub compress_level: u8,
    pub tiled: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            use_fixed_point: true,
            scale_factor: 10000,
            compress: "DEFLATE".to_string(),
            compress_level: 6,
            tiled: true,
        }
    }
}

impl WriteOptions {
    fn creation_options(&self) -> Vec<String> {
        let mut options = Vec::new();
        let compress = self.compress.to_uppercase();

        // Add compression if not NONE
        if compress != "NONE" {
            options.push(format!("COMPRESS={compress}"));
            match compress.as_str() {
                "DEFLATE" => options.push(format!("ZLEVEL={}", self.compress_level.min(9))),
                "ZSTD" => options.push(format!("ZSTD_LEVEL={}", self.compress_level.min(22))),
                _ => {}
            }
        }

        if self.tiled {
            options.push("TILED=YES".to_string());
        }
        options.push("NUM_THREADS=ALL_CPUS".to_string());
        options
    }
}

/// Write a clipped index image as a single band GeoTIFF
pub fn write_index(image: &IndexImage, output_path: &Path, options: &WriteOptions) -> Result<()> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let creation_options = RasterCreationOptions::from_iter(options.creation_options());
    let (width, height) = image.shape;

    let mut out_ds = if options.use_fixed_point {
        driver.create_with_band_type_with_options::<i16, _>(
            output_path,
            width,
            height,
            1,
            &creation_options,
        )?
    } else {
        driver.create_with_band_type_with_options::<f32, _>(
            output_path,
            width,
            height,
            1,
            &creation_options,
        )?
    };

    if !image.geo_info.projection.is_empty() {
        out_ds.set_projection(&image.geo_info.projection)?;
    }
    out_ds.set_geo_transform(&image.geo_info.geo_transform)?;

    {
        let mut band = out_ds.rasterband(1)?;
        if options.use_fixed_point {
            band.set_no_data_value(Some(FIXED_NODATA as f64))?;
            band.set_metadata_item("SCALE", &format!("{}", 1.0 / options.scale_factor as f64), "")?;
            band.set_metadata_item("OFFSET", "0", "")?;
            band.set_description(&format!("{} (scaled by {})", image.name(), options.scale_factor))?;

            let mut buffer = Buffer::new(image.shape, to_fixed_point(&image.data, options.scale_factor));
            band.write((0, 0), image.shape, &mut buffer)?;
        } else {
            band.set_no_data_value(Some(NODATA as f64))?;
            band.set_description(image.name())?;

            let mut buffer = Buffer::new(image.shape, image.data.clone());
            band.write((0, 0), image.shape, &mut buffer)?;
        }
    }

    out_ds.flush_cache()?;
    info!("wrote {} to {}", image.name(), output_path.display());
    Ok(())
}
