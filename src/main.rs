// src/main.rs
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use landsat_indices::batch::{run_batch, BatchConfig};
use landsat_indices::cli::{Cli, Commands};
use landsat_indices::config::{PipelineConfig, RequestContext};
use landsat_indices::io::{write_index, LocalArchive, WriteOptions};
use landsat_indices::processing::anomaly::classify;
use landsat_indices::processing::indices::SpectralIndex;
use landsat_indices::processing::series::build_series;
use landsat_indices::processing::IndexPipeline;
use landsat_indices::region::StudyRegion;
use landsat_indices::utils::cache::IndexCache;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_pipeline(cli: &Cli, config: PipelineConfig) -> Result<IndexPipeline<LocalArchive>> {
    let region = StudyRegion::from_geojson_file(&cli.region)
        .with_context(|| format!("failed to load study region {}", cli.region.display()))?;
    let archive = LocalArchive::open(&cli.catalog)
        .with_context(|| format!("failed to open scene catalog {}", cli.catalog.display()))?;

    Ok(IndexPipeline::with_cache(
        archive,
        Arc::new(region),
        config,
        Arc::new(IndexCache::new()),
    ))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let threads = cli.threads.unwrap_or_else(num_cpus::get);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("failed to start the worker pool")?;

    match &cli.command {
        Commands::Indices => {
            let listing: Vec<_> = SpectralIndex::ALL
                .iter()
                .map(|index| {
                    serde_json::json!({
                        "index": index.name(),
                        "formula": index.formula(),
                        "vis_params": index.vis_params(),
                    })
                })
                .collect();
            print_json(&listing)?;
        }
        Commands::Map {
            index,
            year,
            period,
            output,
            float,
            scale_factor,
        } => {
            let pipeline = open_pipeline(&cli, cli.pipeline_config())?;
            let image = pipeline.compute_index(*year, *period, *index)?;
            let options = WriteOptions {
                use_fixed_point: !float,
                scale_factor: *scale_factor,
                ..WriteOptions::default()
            };
            write_index(&image, output, &options)
                .with_context(|| format!("failed to write {}", output.display()))?;

            print_json(&serde_json::json!({
                "index": index.name(),
                "year": year,
                "period": period,
                "output": output.display().to_string(),
                "valid_pixels": image.valid_count(),
                "vis_params": index.vis_params(),
            }))?;
        }
        Commands::Stats {
            index,
            year,
            period,
        } => {
            let pipeline = open_pipeline(&cli, cli.pipeline_config())?;
            let stats = pipeline.stats(*year, *period, *index)?;
            print_json(&stats.to_map())?;
        }
        Commands::Compare {
            index,
            years,
            period,
        } => {
            let pipeline = open_pipeline(&cli, cli.pipeline_config())?;
            let ctx = RequestContext::new(*index, years.clone(), *period);
            print_json(&pipeline.compare(&ctx))?;
        }
        Commands::Series {
            index,
            from,
            to,
            period,
        } => {
            let pipeline = open_pipeline(&cli, cli.pipeline_config())?;
            let series = build_series(&pipeline, *index, *from, *to, *period)?;
            print_json(&series)?;
        }
        Commands::Anomalies {
            index,
            from,
            to,
            period,
        } => {
            let pipeline = open_pipeline(&cli, cli.pipeline_config())?;
            let series = build_series(&pipeline, *index, *from, *to, *period)?;
            let anomalies = classify(&series);
            if anomalies.is_empty() {
                bail!("no year between {from} and {to} has usable {index} imagery");
            }
            print_json(&anomalies)?;
        }
        Commands::Batch { config } => {
            let batch = BatchConfig::from_file(config)?;
            let pipeline = open_pipeline(&cli, cli.pipeline_config_over(batch.global.pipeline.clone()))?;
            let report = run_batch(&pipeline, &batch);
            print_json(&report)?;
            if report.failed() > 0 {
                bail!("{} of {} operations failed", report.failed(), report.outcomes.len());
            }
        }
    }

    Ok(())
}
