use anyhow::anyhow;

use super::hex::Rgba;

/// Linearly interpolate between two colors, rounding each channel to the nearest integer.
/// `factor` is clamped to [0, 1].
pub fn interpolate_color(start: Rgba, end: Rgba, factor: f64) -> Rgba {
    let factor = if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    };
    let channel = |from: u8, to: u8| -> u8 {
        let value = from as f64 + factor * (to as f64 - from as f64);
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba::new(
        channel(start.r, end.r),
        channel(start.g, end.g),
        channel(start.b, end.b),
        channel(start.a, end.a),
    )
}

/// Ordered, non-empty list of colors used as a discrete palette or as gradient stops.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    colors: Vec<Rgba>,
}

impl ColorRamp {
    /// Sample `steps` colors evenly from `start` to `end`, both ends included.
    /// A single step yields just `start`.
    pub fn linear(start: Rgba, end: Rgba, steps: usize) -> anyhow::Result<Self> {
        if steps == 0 {
            return Err(anyhow!("A color ramp needs at least one step"));
        }
        if steps == 1 {
            return Ok(Self {
                colors: vec![start],
            });
        }
        let colors = (0..steps)
            .map(|step| interpolate_color(start, end, step as f64 / (steps - 1) as f64))
            .collect();
        Ok(Self { colors })
    }

    pub fn from_colors(colors: Vec<Rgba>) -> anyhow::Result<Self> {
        if colors.is_empty() {
            return Err(anyhow!("A color ramp needs at least one color"));
        }
        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn first(&self) -> Rgba {
        self.colors[0]
    }

    /// Index of the ramp bin `value` falls in when [min, max] is split into `len()` equal bins.
    /// Values outside the range clamp to the first or last bin; a degenerate range maps to 0.
    pub fn index_for_value(&self, value: f64, min: f64, max: f64) -> usize {
        if min == max || value.is_nan() {
            return 0;
        }
        let normalized = ((value - min) / (max - min)).clamp(0.0, 1.0);
        let index = (normalized * self.colors.len() as f64).floor() as usize;
        index.min(self.colors.len() - 1)
    }

    /// Discrete lookup: the color of the bin `value` falls in.
    pub fn color_for_value(&self, value: f64, min: f64, max: f64) -> Rgba {
        self.colors[self.index_for_value(value, min, max)]
    }

    /// Continuous lookup: interpolate between the ramp stops spread evenly over [min, max].
    pub fn interpolate_value(&self, value: f64, min: f64, max: f64) -> Rgba {
        if min == max || value.is_nan() || self.colors.len() == 1 {
            return self.first();
        }
        let normalized = ((value - min) / (max - min)).clamp(0.0, 1.0);
        let position = normalized * (self.colors.len() - 1) as f64;
        let lower = (position.floor() as usize).min(self.colors.len() - 2);
        interpolate_color(
            self.colors[lower],
            self.colors[lower + 1],
            position - lower as f64,
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{interpolate_color, ColorRamp};
    use crate::color::hex::Rgba;

    fn hex(color: &str) -> Rgba {
        Rgba::from_hex(color).unwrap()
    }

    #[rstest]
    #[case("#ffffff", "#ff0000", 0.5, "#ff8080")]
    #[case("#ffffff", "#ff0000", 0.0, "#ffffff")]
    #[case("#ffffff", "#ff0000", 1.0, "#ff0000")]
    #[case("#000000", "#ffffff", 2.0, "#ffffff")]
    #[case("#000000", "#ffffff", -1.0, "#000000")]
    fn test_interpolate_color(
        #[case] start: &str,
        #[case] end: &str,
        #[case] factor: f64,
        #[case] expected: &str,
    ) {
        assert_eq!(expected, interpolate_color(hex(start), hex(end), factor).to_hex());
    }

    #[rstest]
    #[case(2)]
    #[case(5)]
    #[case(10)]
    #[case(256)]
    fn test_linear_ramp_length(#[case] steps: usize) {
        let ramp = ColorRamp::linear(hex("#ffeda0"), hex("#f03b20"), steps).unwrap();
        assert_eq!(steps, ramp.len());
        assert_eq!(hex("#ffeda0"), ramp.first());
        assert_eq!(hex("#f03b20"), *ramp.colors().last().unwrap());
    }

    #[test]
    fn test_linear_ramp_edge_steps() {
        assert!(ColorRamp::linear(hex("#fff"), hex("#000"), 0).is_err());
        let single = ColorRamp::linear(hex("#fff"), hex("#000"), 1).unwrap();
        assert_eq!(vec![hex("#ffffff")], single.colors().to_vec());
        assert!(ColorRamp::from_colors(vec![]).is_err());
    }

    #[test]
    fn test_degenerate_range_returns_first_color() {
        let ramp = ColorRamp::linear(hex("#ffffff"), hex("#ff0000"), 10).unwrap();
        assert_eq!(ramp.first(), ramp.color_for_value(42.0, 7.0, 7.0));
        assert_eq!(ramp.first(), ramp.interpolate_value(42.0, 7.0, 7.0));
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(9.99, 0)]
    #[case(10.0, 1)]
    #[case(55.0, 5)]
    #[case(100.0, 9)]
    #[case(150.0, 9)]
    #[case(-5.0, 0)]
    fn test_index_for_value(#[case] value: f64, #[case] expected_index: usize) {
        let ramp = ColorRamp::linear(hex("#ffffff"), hex("#ff0000"), 10).unwrap();
        assert_eq!(expected_index, ramp.index_for_value(value, 0.0, 100.0));
    }

    #[test]
    fn test_interpolate_value_across_stops() {
        let ramp =
            ColorRamp::from_colors(vec![hex("#000000"), hex("#ffffff"), hex("#ff0000")]).unwrap();
        assert_eq!(hex("#000000"), ramp.interpolate_value(0.0, 0.0, 2.0));
        assert_eq!(hex("#808080"), ramp.interpolate_value(0.5, 0.0, 2.0));
        assert_eq!(hex("#ffffff"), ramp.interpolate_value(1.0, 0.0, 2.0));
        assert_eq!(hex("#ff8080"), ramp.interpolate_value(1.5, 0.0, 2.0));
        assert_eq!(hex("#ff0000"), ramp.interpolate_value(3.0, 0.0, 2.0));
    }
}
