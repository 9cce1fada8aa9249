// src/batch.rs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{Period, PipelineConfig};
use crate::processing::anomaly::classify;
use crate::processing::indices::SpectralIndex;
use crate::processing::series::build_series;
use crate::processing::IndexPipeline;
use crate::service::ImageryService;

#[derive(Deserialize, Serialize, Debug)]
pub struct BatchConfig {
    #[serde(default)]
    pub global: GlobalParams,
    pub operations: Vec<Operation>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GlobalParams {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub float: bool,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: i32,
    #[serde(default = "default_compress")]
    pub compress: String,
    #[serde(default = "default_compress_level")]
    pub compress_level: u8,
    #[serde(default = "default_true")]
    pub tiled: bool,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            float: false,
            scale_factor: default_scale_factor(),
            compress: default_compress(),
            compress_level: default_compress_level(),
            tiled: true,
        }
    }
}

fn default_compress() -> String {
    "DEFLATE".to_string()
}

fn default_compress_level() -> u8 {
    6
}

fn default_scale_factor() -> i32 {
    10000
}

fn default_true() -> bool {
    true
}

/// GeoTIFF settings a map operation may override
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct OutputOverrides {
    pub float: Option<bool>,
    pub scale_factor: Option<i32>,
    pub compress: Option<String>,
    pub compress_level: Option<u8>,
    pub tiled: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    /// Index map written as GeoTIFF
    Map {
        index: SpectralIndex,
        year: i32,
        #[serde(default)]
        period: Period,
        output: PathBuf,
        #[serde(flatten)]
        overrides: OutputOverrides,
    },
    /// Region statistics for one or more years
    Stats {
        index: SpectralIndex,
        years: Vec<i32>,
        #[serde(default)]
        period: Period,
        output: Option<PathBuf>,
    },
    /// Yearly mean series over an inclusive range
    Series {
        index: SpectralIndex,
        start: i32,
        end: i32,
        #[serde(default)]
        period: Period,
        output: Option<PathBuf>,
    },
    /// Yearly anomalies and severity tiers over an inclusive range
    Anomalies {
        index: SpectralIndex,
        start: i32,
        end: i32,
        #[serde(default)]
        period: Period,
        output: Option<PathBuf>,
    },
}

impl Operation {
    pub fn describe(&self) -> String {
        match self {
            Operation::Map { index, year, period, output, .. } => {
                format!("map {index} {year} {period} -> {}", output.display())
            }
            Operation::Stats { index, years, period, .. } => {
                format!("stats {index} {years:?} {period}")
            }
            Operation::Series { index, start, end, period, .. } => {
                format!("series {index} {start}-{end} {period}")
            }
            Operation::Anomalies { index, start, end, period, .. } => {
                format!("anomalies {index} {start}-{end} {period}")
            }
        }
    }
}

/// Result of one batch operation
#[derive(Serialize, Debug)]
pub struct OperationOutcome {
    pub operation: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

#[derive(Serialize, Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.ok).count()
    }
}

impl BatchConfig {
    pub fn from_file(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read batch config {}", config_path.display()))?;
        Self::from_json(&config_content)
            .with_context(|| format!("invalid batch config {}", config_path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Run every operation in order. A failing operation is recorded and the
/// remaining ones still run.
pub fn run_batch<S: ImageryService>(pipeline: &IndexPipeline<S>, config: &BatchConfig) -> BatchReport {
    info!("Starting batch processing with {} operations", config.operations.len());

    let mut report = BatchReport::default();
    for (i, op) in config.operations.iter().enumerate() {
        let operation = op.describe();
        info!("[{}/{}] {}", i + 1, config.operations.len(), operation);

        let outcome = match run_operation(pipeline, &config.global, op) {
            Ok(result) => OperationOutcome {
                operation,
                ok: true,
                error: None,
                result,
            },
            Err(e) => {
                warn!("{} failed: {:#}", operation, e);
                OperationOutcome {
                    operation,
                    ok: false,
                    error: Some(format!("{e:#}")),
                    result: None,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    info!(
        "Batch processing complete: {} ok, {} failed",
        report.outcomes.len() - report.failed(),
        report.failed()
    );
    report
}

fn run_operation<S: ImageryService>(
    pipeline: &IndexPipeline<S>,
    global: &GlobalParams,
    op: &Operation,
) -> Result<Option<Value>> {
    let (value, output) = match op {
        Operation::Map {
            index,
            year,
            period,
            output,
            overrides,
        } => return run_map(pipeline, global, *index, *year, *period, output, overrides),
        Operation::Stats {
            index,
            years,
            period,
            output,
        } => {
            let stats = years
                .iter()
                .map(|&year| -> Result<(String, Value)> {
                    let stats = pipeline.stats(year, *period, *index)?;
                    Ok((year.to_string(), serde_json::to_value(stats.to_map())?))
                })
                .collect::<Result<serde_json::Map<_, _>>>()
                .with_context(|| format!("{index} statistics failed"))?;
            (Value::Object(stats), output)
        }
        Operation::Series {
            index,
            start,
            end,
            period,
            output,
        } => {
            let series = build_series(pipeline, *index, *start, *end, *period)?;
            (serde_json::to_value(series)?, output)
        }
        Operation::Anomalies {
            index,
            start,
            end,
            period,
            output,
        } => {
            let series = build_series(pipeline, *index, *start, *end, *period)?;
            (serde_json::to_value(classify(&series))?, output)
        }
    };

    match output {
        Some(path) => {
            fs::write(path, serde_json::to_string_pretty(&value)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(Some(Value::String(path.display().to_string())))
        }
        None => Ok(Some(value)),
    }
}

#[cfg(feature = "gdal")]
fn run_map<S: ImageryService>(
    pipeline: &IndexPipeline<S>,
    global: &GlobalParams,
    index: SpectralIndex,
    year: i32,
    period: Period,
    output: &Path,
    overrides: &OutputOverrides,
) -> Result<Option<Value>> {
    use crate::io::{write_index, WriteOptions};

    let options = WriteOptions {
        use_fixed_point: !overrides.float.unwrap_or(global.float),
        scale_factor: overrides.scale_factor.unwrap_or(global.scale_factor),
        compress: overrides
            .compress
            .clone()
            .unwrap_or_else(|| global.compress.clone()),
        compress_level: overrides.compress_level.unwrap_or(global.compress_level),
        tiled: overrides.tiled.unwrap_or(global.tiled),
    };

    let image = pipeline.compute_index(year, period, index)?;
    write_index(&image, output, &options)?;
    Ok(Some(serde_json::json!({
        "output": output.display().to_string(),
        "valid_pixels": image.valid_count(),
        "vis_params": index.vis_params(),
    })))
}

#[cfg(not(feature = "gdal"))]
fn run_map<S: ImageryService>(
    _pipeline: &IndexPipeline<S>,
    _global: &GlobalParams,
    _index: SpectralIndex,
    _year: i32,
    _period: Period,
    output: &Path,
    _overrides: &OutputOverrides,
) -> Result<Option<Value>> {
    anyhow::bail!(
        "cannot write {}: GeoTIFF output needs the gdal feature",
        output.display()
    )
}
