// src/processing/anomaly.rs
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::processing::series::YearlyEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Mild,
    Moderate,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

/// Signed severity bucket of a yearly anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Severity {
    pub tier: Tier,
    pub direction: Direction,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tier = match self.tier {
            Tier::Mild => "mild",
            Tier::Moderate => "moderate",
            Tier::Extreme => "extreme",
        };
        let direction = match self.direction {
            Direction::Positive => "positive",
            Direction::Negative => "negative",
        };
        write!(f, "{tier} {direction}")
    }
}

/// Mean and population standard deviation of the non-null series values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl Baseline {
    pub fn from_series(series: &[YearlyEntry]) -> Result<Self> {
        let values: Vec<f64> = series.iter().filter_map(|e| e.value).collect();
        if values.is_empty() {
            return Err(Error::EmptySeriesError);
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Ok(Self {
            mean,
            std: variance.sqrt(),
            count: values.len(),
        })
    }

    /// Bucket an anomaly: `>= std` extreme, `>= std/2` moderate, else mild.
    /// A flat baseline (no spread) classifies everything as mild.
    pub fn severity(&self, anomaly: f64) -> Severity {
        let direction = if anomaly < 0.0 {
            Direction::Negative
        } else {
            Direction::Positive
        };
        let flat = self.std <= f64::EPSILON * self.mean.abs().max(1.0);
        let magnitude = anomaly.abs();
        let tier = if flat {
            Tier::Mild
        } else if magnitude >= self.std {
            Tier::Extreme
        } else if magnitude >= 0.5 * self.std {
            Tier::Moderate
        } else {
            Tier::Mild
        };
        Severity { tier, direction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyEntry {
    pub year: i32,
    pub value: f64,
    pub anomaly: f64,
    pub severity: Severity,
}

/// Anomalies of the non-null entries, in series order.
/// Fails with `EmptySeriesError` when there is nothing to classify.
pub fn try_classify(series: &[YearlyEntry]) -> Result<Vec<AnomalyEntry>> {
    let baseline = Baseline::from_series(series)?;
    Ok(series
        .iter()
        .filter_map(|entry| {
            entry.value.map(|value| {
                let anomaly = value - baseline.mean;
                AnomalyEntry {
                    year: entry.year,
                    value,
                    anomaly,
                    severity: baseline.severity(anomaly),
                }
            })
        })
        .collect())
}

/// Like `try_classify`, but a series without values gives an empty result
pub fn classify(series: &[YearlyEntry]) -> Vec<AnomalyEntry> {
    try_classify(series).unwrap_or_default()
}
