// src/config.rs
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::processing::indices::SpectralIndex;

/// Scenes at or above this cloud cover percentage are dropped
pub const DEFAULT_CLOUD_COVER: f64 = 20.0;
/// Reduction resolution in map units per pixel
pub const DEFAULT_SCALE: f64 = 30.0;
/// Upper bound on pixels touched by a single reduction
pub const DEFAULT_MAX_PIXELS: u64 = 1_000_000_000;

/// Compositing period within a year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "s1", alias = "1")]
    FirstSemester,
    #[serde(rename = "s2", alias = "2")]
    SecondSemester,
}

impl Period {
    /// Half-open date range covered by this period in `year`.
    ///
    /// Semesters end on day 28 of their last month.
    pub fn date_range(self, year: i32) -> Result<DateRange> {
        let ymd = |y: i32, m: u32, d: u32| {
            NaiveDate::from_ymd_opt(y, m, d).ok_or(Error::InvalidYearRange {
                start: year,
                end: year,
            })
        };
        let (start, end) = match self {
            Period::Year => (ymd(year, 1, 1)?, ymd(year.saturating_add(1), 1, 1)?),
            Period::FirstSemester => (ymd(year, 1, 1)?, ymd(year, 6, 28)?),
            Period::SecondSemester => (ymd(year, 7, 1)?, ymd(year, 12, 28)?),
        };
        Ok(DateRange { start, end })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year => write!(f, "year"),
            Period::FirstSemester => write!(f, "s1"),
            Period::SecondSemester => write!(f, "s2"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "year" | "annual" => Ok(Period::Year),
            "s1" | "1" => Ok(Period::FirstSemester),
            "s2" | "2" => Ok(Period::SecondSemester),
            other => Err(format!("unknown period '{other}' (expected year, s1 or s2)")),
        }
    }
}

/// Half-open date range `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Parameters shared by every request of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_cloud_cover")]
    pub cloud_cover_threshold: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

fn default_cloud_cover() -> f64 {
    DEFAULT_CLOUD_COVER
}

fn default_scale() -> f64 {
    DEFAULT_SCALE
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cloud_cover_threshold: DEFAULT_CLOUD_COVER,
            scale: DEFAULT_SCALE,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Selection made by a caller for one panel: index, years and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub index: SpectralIndex,
    pub years: Vec<i32>,
    #[serde(default)]
    pub period: Period,
}

impl RequestContext {
    pub fn new(index: SpectralIndex, years: Vec<i32>, period: Period) -> Self {
        Self {
            index,
            years,
            period,
        }
    }

    /// Context covering every year of an inclusive range
    pub fn for_range(index: SpectralIndex, start: i32, end: i32, period: Period) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidYearRange { start, end });
        }
        Ok(Self::new(index, (start..=end).collect(), period))
    }
}
