use anyhow::anyhow;
use indicatif::ProgressBar;
use rayon::prelude::*;

use super::{
    grid::RasterGrid,
    stats::{RasterStats, ValidityFilter, CHUNK_SIZE},
};
use crate::color::{
    class_map::{ClassColorMap, ClassRanges},
    hex::Rgba,
    ramp::ColorRamp,
};

/// Gradient over the valid data range, anchored at zero for non-negative data.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousScale {
    pub ramp: ColorRamp,
    pub min: f64,
    pub max: f64,
}

impl ContinuousScale {
    /// Build the scale from raster statistics. The lower end is pulled down to 0 when the data
    /// minimum is positive; a raster that is still constant afterwards cannot be scaled.
    pub fn from_stats(ramp: ColorRamp, stats: &RasterStats) -> anyhow::Result<Self> {
        let min = stats.min.min(0.0);
        if min == stats.max {
            return Err(anyhow!("The raster has constant values ({})", min));
        }
        log::debug!("Value range for the color scale: {} to {}", min, stats.max);
        Ok(Self {
            ramp,
            min,
            max: stats.max,
        })
    }

    pub fn color_for(&self, value: f64) -> Rgba {
        self.ramp.interpolate_value(value, self.min, self.max)
    }
}

/// How cell values become colors.
#[derive(Debug, Clone, PartialEq)]
pub enum Classifier {
    /// Exact match on the integer class code.
    Discrete(ClassColorMap),
    /// First matching inclusive value range.
    Ranges(ClassRanges),
    Continuous(ContinuousScale),
}

impl Classifier {
    pub fn color_for(&self, value: f64) -> Rgba {
        match self {
            Classifier::Discrete(map) => map.color_for(value),
            Classifier::Ranges(ranges) => ranges.color_for(value),
            Classifier::Continuous(scale) => scale.color_for(value),
        }
    }

    /// Class codes listed in a discrete color map are drawn even when they look like no-data.
    pub fn is_listed_class(&self, value: f64) -> bool {
        match self {
            Classifier::Discrete(map) => map.contains(value),
            _ => false,
        }
    }
}

/// Color every cell of the grid, returning RGBA bytes in row-major order.
///
/// Invalid cells are transparent unless they are a class listed in a discrete map. Work is split into chunks processed
/// in parallel.
pub fn classify_grid(grid: &RasterGrid, classifier: &Classifier) -> Vec<u8> {
    let filter = ValidityFilter::for_grid(grid);
    let mut pixels = vec![0u8; grid.len() * 4];
    let bar = ProgressBar::new(grid.len() as u64);
    pixels
        .par_chunks_mut(CHUNK_SIZE * 4)
        .zip(grid.values.par_chunks(CHUNK_SIZE))
        .for_each(|(pixel_chunk, value_chunk)| {
            for (pixel, value) in pixel_chunk.chunks_exact_mut(4).zip(value_chunk) {
                let color = if filter.is_valid(*value) || classifier.is_listed_class(*value) {
                    classifier.color_for(*value)
                } else {
                    Rgba::TRANSPARENT
                };
                pixel.copy_from_slice(&color.to_array());
            }
            bar.inc(value_chunk.len() as u64);
        });
    bar.finish_and_clear();
    pixels
}

#[cfg(test)]
mod tests {
    use super::{classify_grid, Classifier, ContinuousScale};
    use crate::{
        color::{class_map::ClassColorMap, class_map::ClassRanges, hex::Rgba, ramp::ColorRamp},
        geometry::extent::Extent,
        raster::{grid::RasterGrid, stats::RasterStats},
    };

    fn grid(values: Vec<f64>) -> RasterGrid {
        let width = values.len();
        RasterGrid::new(width, 1, values, Extent::new(0.0, 0.0, 1.0, 1.0), None).unwrap()
    }

    fn stats(min: f64, max: f64) -> RasterStats {
        RasterStats {
            min,
            max,
            valid_count: 1,
            total_count: 1,
        }
    }

    fn white_to_red() -> ColorRamp {
        ColorRamp::from_colors(vec![
            Rgba::from_hex("#ffffff").unwrap(),
            Rgba::from_hex("#ff0000").unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_continuous_scale_anchors_at_zero() {
        let scale = ContinuousScale::from_stats(white_to_red(), &stats(5.0, 10.0)).unwrap();
        assert_eq!(0.0, scale.min);
        assert_eq!("#ff8080", scale.color_for(5.0).to_hex());
    }

    #[test]
    fn test_constant_raster_cannot_be_scaled() {
        assert!(ContinuousScale::from_stats(white_to_red(), &stats(0.0, 0.0)).is_err());
        // Positive constants are still scalable because the range starts at 0.
        assert!(ContinuousScale::from_stats(white_to_red(), &stats(7.0, 7.0)).is_ok());
    }

    #[test]
    fn test_classify_continuous_makes_invalid_cells_transparent() {
        let grid = grid(vec![0.0, 10.0, -9999.0, f64::NAN]);
        let scale = ContinuousScale::from_stats(white_to_red(), &stats(0.0, 10.0)).unwrap();
        let pixels = classify_grid(&grid, &Classifier::Continuous(scale));
        assert_eq!(
            vec![255, 255, 255, 255, 255, 0, 0, 255, 0, 0, 0, 0, 0, 0, 0, 0],
            pixels
        );
    }

    #[test]
    fn test_classify_discrete() {
        let grid = grid(vec![1.0, 2.0, 3.0]);
        let map = ClassColorMap::parse("1:#ff0000,2:#00ff0080").unwrap();
        let pixels = classify_grid(&grid, &Classifier::Discrete(map));
        assert_eq!(vec![255, 0, 0, 255, 0, 255, 0, 128, 0, 0, 0, 0], pixels);
    }

    #[test]
    fn test_classify_discrete_draws_listed_negative_classes() {
        let grid = grid(vec![-1.0, -9999.0, 2.0, -3.0]);
        let map = ClassColorMap::parse("-1:#0000ff,-9999:#000000,2:#ff0000").unwrap();
        let pixels = classify_grid(&grid, &Classifier::Discrete(map));
        assert_eq!(
            vec![0, 0, 255, 255, 0, 0, 0, 255, 255, 0, 0, 255, 0, 0, 0, 0],
            pixels
        );
    }

    #[test]
    fn test_classify_ranges_across_chunks() {
        let values: Vec<f64> = (0..250_000).map(|i| (i % 80) as f64).collect();
        let grid = grid(values.clone());
        let classifier = Classifier::Ranges(ClassRanges::productivity_potential());
        let pixels = classify_grid(&grid, &classifier);
        assert_eq!(values.len() * 4, pixels.len());
        for (index, value) in values.iter().enumerate().step_by(997) {
            assert_eq!(
                classifier.color_for(*value).to_array(),
                pixels[index * 4..index * 4 + 4]
            );
        }
    }
}
