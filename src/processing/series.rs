// src/processing/series.rs
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Period, RequestContext};
use crate::error::{Error, Result};
use crate::processing::indices::SpectralIndex;
use crate::processing::pipeline::IndexPipeline;
use crate::service::ImageryService;

/// Region mean of an index for one year; None when no usable imagery
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyEntry {
    pub year: i32,
    pub value: Option<f64>,
}

/// One entry per year of `[year_start, year_end]`, ascending.
///
/// Years without qualifying scenes, or whose index is fully masked, get
/// `value: None`. Service and reduction failures still propagate.
pub fn build_series<S: ImageryService>(
    pipeline: &IndexPipeline<S>,
    index: SpectralIndex,
    year_start: i32,
    year_end: i32,
    period: Period,
) -> Result<Vec<YearlyEntry>> {
    let ctx = RequestContext::for_range(index, year_start, year_end, period)?;
    series_for(pipeline, &ctx)
}

/// `build_series` for an index given by name
pub fn build_series_named<S: ImageryService>(
    pipeline: &IndexPipeline<S>,
    index_name: &str,
    year_start: i32,
    year_end: i32,
    period: Period,
) -> Result<Vec<YearlyEntry>> {
    build_series(pipeline, index_name.parse()?, year_start, year_end, period)
}

/// Series over the years listed in a request context, sorted by year
pub fn series_for<S: ImageryService>(
    pipeline: &IndexPipeline<S>,
    ctx: &RequestContext,
) -> Result<Vec<YearlyEntry>> {
    let mut years = ctx.years.clone();
    years.sort_unstable();
    years.dedup();

    let mut series = Vec::with_capacity(years.len());
    for year in years {
        let value = match pipeline.try_compute_index(year, ctx.period, ctx.index)? {
            Some(image) => pipeline.reduce_stats(&image)?.mean,
            None => None,
        };
        if value.is_none() {
            warn!("{} {} {}: no usable imagery", ctx.index, year, ctx.period);
        }
        series.push(YearlyEntry { year, value });
    }

    info!(
        "{} series: {} of {} years with data",
        ctx.index,
        series.iter().filter(|e| e.value.is_some()).count(),
        series.len()
    );
    Ok(series)
}

/// Year/value pairs with missing years dropped, ready for plotting
pub fn plottable(series: &[YearlyEntry]) -> Vec<(i32, f64)> {
    series
        .iter()
        .filter_map(|entry| entry.value.map(|value| (entry.year, value)))
        .collect()
}

/// Checks that a series has exactly one ascending entry per year of its span
pub fn is_complete(series: &[YearlyEntry], year_start: i32, year_end: i32) -> Result<bool> {
    if year_start > year_end {
        return Err(Error::InvalidYearRange {
            start: year_start,
            end: year_end,
        });
    }
    Ok(series.len() as i64 == i64::from(year_end) - i64::from(year_start) + 1
        && series
            .iter()
            .zip(year_start..=year_end)
            .all(|(entry, year)| entry.year == year))
}
