use anyhow::anyhow;
use rayon::prelude::*;
use serde::Serialize;

use super::grid::RasterGrid;

/// Common no-data markers that are never treated as data.
pub const SENTINEL_VALUES: [f64; 4] = [-9999.0, -32768.0, 32767.0, 65535.0];

/// Rasters with more cells than this compute min/max from a strided sample.
pub const SAMPLING_THRESHOLD: usize = 1_000_000;

/// Number of cells processed per parallel work item.
pub const CHUNK_SIZE: usize = 100_000;

const MAX_REPORTED_INVALID_VALUES: usize = 10;

/// Decides whether a cell holds data.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValidityFilter {
    pub no_data: Option<f64>,
}

impl ValidityFilter {
    pub fn for_grid(grid: &RasterGrid) -> Self {
        Self {
            no_data: grid.no_data,
        }
    }

    /// Valid cells are finite, non-negative, not a common sentinel and not the band's no-data value.
    pub fn is_valid(&self, value: f64) -> bool {
        value.is_finite()
            && value >= 0.0
            && !SENTINEL_VALUES.contains(&value)
            && self.no_data.map_or(true, |no_data| value != no_data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RasterStats {
    pub min: f64,
    pub max: f64,
    pub valid_count: usize,
    pub total_count: usize,
}

impl RasterStats {
    pub fn valid_percent(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.valid_count as f64 / self.total_count as f64 * 100.0
    }
}

#[derive(Debug, Clone)]
struct ChunkSummary {
    min: f64,
    max: f64,
    valid_count: usize,
    invalid_values: Vec<f64>,
}

impl ChunkSummary {
    fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            valid_count: 0,
            invalid_values: Vec::new(),
        }
    }

    fn add(mut self, value: f64, filter: &ValidityFilter) -> Self {
        if filter.is_valid(value) {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            self.valid_count += 1;
        } else {
            self.note_invalid(value);
        }
        self
    }

    fn note_invalid(&mut self, value: f64) {
        if self.invalid_values.len() < MAX_REPORTED_INVALID_VALUES
            && !self
                .invalid_values
                .iter()
                .any(|seen| seen.to_bits() == value.to_bits())
        {
            self.invalid_values.push(value);
        }
    }

    fn merge(mut self, other: ChunkSummary) -> Self {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.valid_count += other.valid_count;
        for value in other.invalid_values {
            self.note_invalid(value);
        }
        self
    }
}

/// Min/max over a strided sample of about `min(10000, len / 100)` cells.
fn sampled_min_max(values: &[f64], filter: &ValidityFilter) -> Option<(f64, f64)> {
    let sample_size = (values.len() / 100).clamp(1, 10_000);
    let step = (values.len() / sample_size).max(1);
    values
        .iter()
        .step_by(step)
        .filter(|value| filter.is_valid(**value))
        .fold(None, |min_max, value| match min_max {
            None => Some((*value, *value)),
            Some((min, max)) => Some((min.min(*value), max.max(*value))),
        })
}

/// Count valid cells and find the data range, excluding sentinel and no-data cells.
///
/// Fails with "no valid data" when every cell is invalid, listing a few of the invalid values seen.
pub fn compute_stats(grid: &RasterGrid) -> anyhow::Result<RasterStats> {
    let filter = ValidityFilter::for_grid(grid);
    let summary = grid
        .values
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            chunk
                .iter()
                .fold(ChunkSummary::empty(), |summary, value| summary.add(*value, &filter))
        })
        .reduce(ChunkSummary::empty, ChunkSummary::merge);

    if summary.valid_count == 0 {
        let invalid: Vec<String> = summary
            .invalid_values
            .iter()
            .map(|value| value.to_string())
            .collect();
        return Err(anyhow!(
            "The raster has no valid data. Values found: {}",
            invalid.join(", ")
        ));
    }
    log::info!(
        "Valid data: {}/{} ({:.1}%)",
        summary.valid_count,
        grid.len(),
        summary.valid_count as f64 / grid.len() as f64 * 100.0
    );

    let (min, max) = if grid.len() > SAMPLING_THRESHOLD {
        log::info!("Large raster, computing the value range from a sample");
        sampled_min_max(&grid.values, &filter)
            .ok_or_else(|| anyhow!("No valid data found in the raster sample"))?
    } else {
        (summary.min, summary.max)
    };

    Ok(RasterStats {
        min,
        max,
        valid_count: summary.valid_count,
        total_count: grid.len(),
    })
}
