use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Period, PipelineConfig};
use crate::processing::indices::SpectralIndex;

fn parse_index(s: &str) -> Result<SpectralIndex, String> {
    s.parse::<SpectralIndex>().map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "landsat-indices")]
#[command(about = "Landsat spectral index maps, yearly series and anomalies over a study region")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Scene catalog (JSON) of the local Landsat archive
    #[arg(short, long, default_value = "catalog.json", global = true)]
    pub catalog: PathBuf,

    /// Study region (GeoJSON)
    #[arg(short, long, default_value = "region.geojson", global = true)]
    pub region: PathBuf,

    /// Worker threads for per-pixel work (default: all cores)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// Drop scenes with this much cloud cover (percent) or more [default: 20]
    #[arg(long, global = true)]
    pub cloud_cover: Option<f64>,

    /// Reduction resolution in map units per pixel [default: 30]
    #[arg(long, global = true)]
    pub scale: Option<f64>,

    /// Pixel budget of a single region reduction [default: 1e9]
    #[arg(long, global = true)]
    pub max_pixels: Option<u64>,
}

impl Cli {
    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline_config_over(PipelineConfig::default())
    }

    /// `base` with every pipeline flag given on the command line applied on
    /// top, so flags beat a batch file's `global` section
    pub fn pipeline_config_over(&self, base: PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            cloud_cover_threshold: self.cloud_cover.unwrap_or(base.cloud_cover_threshold),
            scale: self.scale.unwrap_or(base.scale),
            max_pixels: self.max_pixels.unwrap_or(base.max_pixels),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an index map for one year as GeoTIFF
    Map {
        /// Spectral index (NDVI, SAVI, EVI, GNDVI, LSWI, NDWI, MNDWI)
        #[arg(short, long, value_parser = parse_index)]
        index: SpectralIndex,

        #[arg(short, long)]
        year: i32,

        /// Compositing period: year, s1 or s2
        #[arg(short, long, default_value = "year")]
        period: Period,

        /// Output file path
        #[arg(short, long, default_value = "output.tif")]
        output: PathBuf,

        /// Use float32 instead of int16
        #[arg(long)]
        float: bool,

        /// Scaling factor for fixed-point
        #[arg(long, default_value = "10000")]
        scale_factor: i32,
    },

    /// Mean, min and max of an index over the region for one year
    Stats {
        #[arg(short, long, value_parser = parse_index)]
        index: SpectralIndex,

        #[arg(short, long)]
        year: i32,

        #[arg(short, long, default_value = "year")]
        period: Period,
    },

    /// Statistics for several years side by side
    Compare {
        #[arg(short, long, value_parser = parse_index)]
        index: SpectralIndex,

        /// Years to compare, in display order
        #[arg(short, long, num_args = 1.., required = true)]
        years: Vec<i32>,

        #[arg(short, long, default_value = "year")]
        period: Period,
    },

    /// Yearly region mean over an inclusive range of years
    Series {
        #[arg(short, long, value_parser = parse_index)]
        index: SpectralIndex,

        #[arg(long, default_value = "2000")]
        from: i32,

        #[arg(long, default_value = "2025")]
        to: i32,

        #[arg(short, long, default_value = "year")]
        period: Period,
    },

    /// Yearly anomalies against the historical mean, with severity tiers
    Anomalies {
        #[arg(short, long, value_parser = parse_index)]
        index: SpectralIndex,

        #[arg(long, default_value = "2000")]
        from: i32,

        #[arg(long, default_value = "2025")]
        to: i32,

        #[arg(short, long, default_value = "year")]
        period: Period,
    },

    /// Run the operations of a JSON batch file
    Batch {
        #[arg(short = 'f', long)]
        config: PathBuf,
    },

    /// List the supported indices with formulas and display ranges
    Indices,
}
