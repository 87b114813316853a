//! Whole-grid summary statistics.
//!
//! Mean, minimum and maximum are computed together in one parallel pass
//! over time slabs. Each slab produces a partial accumulator; partials are
//! merged associatively so the slab order does not matter.

use climate_common::{GridSource, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::types::GridSummary;

/// Partial sum/count/extrema over a set of samples.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
}

impl Accumulator {
    const EMPTY: Self = Self {
        sum: 0.0,
        count: 0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    fn push(mut self, v: f32) -> Self {
        if v.is_nan() {
            return self;
        }
        let v = v as f64;
        self.sum += v;
        self.count += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            count: self.count + other.count,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Compute mean, min and max of every valid sample in `source`.
///
/// NaN samples are skipped. A grid without valid samples reports NaN for
/// all three statistics.
pub fn summarize(source: &dyn GridSource) -> Result<GridSummary> {
    let chunks = source.time_chunks();
    debug!(slabs = chunks.len(), "Summarising grid");

    let acc = chunks
        .into_par_iter()
        .map(|range| -> Result<Accumulator> {
            let slab = source.read_time_slab(range)?;
            Ok(slab.into_iter().fold(Accumulator::EMPTY, Accumulator::push))
        })
        .try_reduce(|| Accumulator::EMPTY, |a, b| Ok(a.merge(b)))?;

    let summary = if acc.count == 0 {
        GridSummary {
            mean: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            count: 0,
            units: source.units(),
        }
    } else {
        GridSummary {
            mean: acc.sum / acc.count as f64,
            min: acc.min,
            max: acc.max,
            count: acc.count,
            units: source.units(),
        }
    };

    info!(
        variable = source.variable(),
        count = summary.count,
        mean = summary.mean,
        min = summary.min,
        max = summary.max,
        units = %summary.units,
        "Computed grid statistics"
    );
    Ok(summary)
}
