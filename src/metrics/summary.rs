use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};
use crate::metrics::psnr::round3;
use crate::metrics::reducer::PsnrSequence;

/// Ready-made comparisons for [`MetricsSummary::filter_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Below,
    AtMost,
    Above,
    AtLeast,
    Equal,
}

impl Comparison {
    /// Evaluate `value <op> parameter`
    pub fn matches(self, value: f64, parameter: f64) -> bool {
        match self {
            Self::Below => value < parameter,
            Self::AtMost => value <= parameter,
            Self::Above => value > parameter,
            Self::AtLeast => value >= parameter,
            Self::Equal => value == parameter,
        }
    }
}

/// Samples selected by a filter, with their share of the whole sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredSamples {
    pub count: usize,
    /// Percentage of all samples, rounded to 3 decimals
    pub ratio: f64,
    pub values: Vec<f64>,
}

/// Read-only statistics over a non-empty [`PsnrSequence`]
///
/// Every statistic is computed on demand from the borrowed sequence; nothing
/// is cached or mutated.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSummary<'a> {
    sequence: &'a PsnrSequence,
}

impl<'a> MetricsSummary<'a> {
    /// Fails with `MetricsError::EmptySequence` when no frames were compared
    pub fn new(sequence: &'a PsnrSequence) -> Result<Self> {
        if sequence.is_empty() {
            return Err(MetricsError::EmptySequence.into());
        }
        Ok(Self { sequence })
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn min(&self) -> f64 {
        self.sequence.values().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.sequence.values().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Middle value; the mean of the two middle values for even lengths
    pub fn median(&self) -> f64 {
        let mut sorted: Vec<f64> = self.sequence.values().collect();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Select samples for which `predicate(value, parameter)` holds
    pub fn filter<F>(&self, predicate: F, parameter: f64) -> FilteredSamples
    where
        F: Fn(f64, f64) -> bool,
    {
        let values: Vec<f64> = self
            .sequence
            .values()
            .filter(|&value| predicate(value, parameter))
            .collect();
        let ratio = round3(values.len() as f64 / self.sequence.len() as f64 * 100.0);

        FilteredSamples { count: values.len(), ratio, values }
    }

    /// [`MetricsSummary::filter`] with a built-in comparison
    pub fn filter_by(&self, comparison: Comparison, parameter: f64) -> FilteredSamples {
        self.filter(|value, parameter| comparison.matches(value, parameter), parameter)
    }

    /// Snapshot of the headline statistics
    pub fn snapshot(&self) -> SummaryStats {
        SummaryStats {
            frames: self.len(),
            min: self.min(),
            max: self.max(),
            median: self.median(),
        }
    }
}

/// Owned copy of the headline statistics, for reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub frames: usize,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}
