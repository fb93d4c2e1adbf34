use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{
    classify::{classify_grid, Classifier, ContinuousScale},
    grid::RasterGrid,
    png::encode_rgba_png,
    stats::{compute_stats, RasterStats},
};
use crate::{
    color::{
        class_map::{ClassColorMap, ClassRanges},
        hex::Rgba,
        legend::{Legend, LegendEntry},
        ramp::ColorRamp,
    },
    geometry::extent::Extent,
};

/// Opacity raster overlays are drawn with on top of the base map.
pub const OVERLAY_OPACITY: f64 = 0.8;

/// Number of colors sampled for a continuous raster legend.
const GRADIENT_LEGEND_STEPS: usize = 5;

/// How a raster section colors its cells.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RasterStyle {
    /// `color_map` is a `"value:color,..."` string keyed by integer class.
    Discrete {
        color_map: String,
        #[serde(default)]
        legend: Vec<LegendEntry>,
    },
    /// Inclusive value ranges; the productivity potential classes when omitted.
    Ranges {
        #[serde(default)]
        ranges: Option<ClassRanges>,
    },
    /// Gradient from `start_color` to `end_color`, or through `colors` when given.
    Continuous {
        #[serde(default = "default_start_color")]
        start_color: Rgba,
        #[serde(default = "default_end_color")]
        end_color: Rgba,
        #[serde(default)]
        colors: Option<Vec<Rgba>>,
    },
}

fn default_start_color() -> Rgba {
    Rgba::opaque(0x00, 0x4a, 0x13)
}

fn default_end_color() -> Rgba {
    Rgba::opaque(0xdc, 0x0b, 0x00)
}

impl RasterStyle {
    fn classifier_and_legend(
        &self,
        title: &str,
        stats: &RasterStats,
    ) -> anyhow::Result<(Classifier, Legend)> {
        match self {
            RasterStyle::Discrete { color_map, legend } => {
                let map = ClassColorMap::parse(color_map)?;
                let legend = if legend.is_empty() {
                    Legend::from_class_map(title, &map)
                } else {
                    Legend::Categories {
                        title: title.to_owned(),
                        entries: legend.clone(),
                    }
                };
                Ok((Classifier::Discrete(map), legend))
            }
            RasterStyle::Ranges { ranges } => {
                let ranges = ranges
                    .clone()
                    .unwrap_or_else(ClassRanges::productivity_potential);
                let legend = Legend::from_class_ranges(title, &ranges);
                Ok((Classifier::Ranges(ranges), legend))
            }
            RasterStyle::Continuous {
                start_color,
                end_color,
                colors,
            } => {
                let ramp = match colors {
                    Some(colors) => ColorRamp::from_colors(colors.clone())?,
                    None => ColorRamp::from_colors(vec![*start_color, *end_color])?,
                };
                let scale = ContinuousScale::from_stats(ramp, stats)?;
                let legend = Legend::sampled_gradient(
                    title,
                    None,
                    &scale.ramp,
                    scale.min,
                    scale.max,
                    GRADIENT_LEGEND_STEPS,
                );
                Ok((Classifier::Continuous(scale), legend))
            }
        }
    }
}

/// A colored raster ready to be laid over a map.
#[derive(Debug, Clone)]
pub struct RasterOverlay {
    pub width: usize,
    pub height: usize,
    pub png: Vec<u8>,
    pub extent: Extent,
    pub stats: RasterStats,
    pub legend: Legend,
}

/// What a web map needs to place an overlay image.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayDescription {
    pub image: String,
    pub width: usize,
    pub height: usize,
    /// South-west and north-east corners as `[lat, lon]`.
    pub bounds: [[f64; 2]; 2],
    pub opacity: f64,
    pub stats: RasterStats,
    pub legend: Legend,
}

pub fn render_overlay(
    grid: &RasterGrid,
    style: &RasterStyle,
    title: &str,
) -> anyhow::Result<RasterOverlay> {
    let stats = compute_stats(grid)?;
    let (classifier, legend) = style.classifier_and_legend(title, &stats)?;
    log::info!(
        "Coloring {}x{} raster, {:.1}% valid cells",
        grid.width,
        grid.height,
        stats.valid_percent()
    );
    let pixels = classify_grid(grid, &classifier);
    let png = encode_rgba_png(&pixels, grid.width, grid.height)?;
    Ok(RasterOverlay {
        width: grid.width,
        height: grid.height,
        png,
        extent: grid.extent,
        stats,
        legend,
    })
}

impl RasterOverlay {
    /// Write the image as `<name>.png` in `output_dir` and describe where it goes.
    pub fn write(&self, output_dir: &Path, name: &str) -> anyhow::Result<OverlayDescription> {
        let image = format!("{}.png", name);
        let filepath: PathBuf = output_dir.join(&image);
        fs::write(&filepath, &self.png)
            .with_context(|| format!("Writing raster image {:?}", filepath))?;
        log::info!("Wrote raster overlay {:?}", filepath);
        Ok(OverlayDescription {
            image,
            width: self.width,
            height: self.height,
            bounds: self.extent.corners(),
            opacity: OVERLAY_OPACITY,
            stats: self.stats,
            legend: self.legend.clone(),
        })
    }
}

/// Two rasters of the same species, current and under climate change, shown side by side.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonDescription {
    pub current: OverlayDescription,
    pub climate_change: OverlayDescription,
    /// Union of both rasters' bounds, as `[lat, lon]` corners.
    pub bounds: [[f64; 2]; 2],
}

/// File names of the current and climate-change rasters of a species.
pub fn comparison_filenames(species: &str) -> (String, String) {
    (
        format!("{}_4326.tif", species),
        format!("{}_CC_4326.tif", species),
    )
}

/// Render both rasters with the same style and write them as `<name>_current.png` and
/// `<name>_cc.png`.
pub fn render_comparison(
    current: &RasterGrid,
    climate_change: &RasterGrid,
    style: &RasterStyle,
    title: &str,
    output_dir: &Path,
    name: &str,
) -> anyhow::Result<ComparisonDescription> {
    let current_overlay = render_overlay(current, style, title)
        .context("Rendering the current raster")?;
    let climate_change_overlay = render_overlay(climate_change, style, title)
        .context("Rendering the climate change raster")?;
    let bounds = current_overlay
        .extent
        .union(&climate_change_overlay.extent)
        .corners();
    Ok(ComparisonDescription {
        current: current_overlay.write(output_dir, &format!("{}_current", name))?,
        climate_change: climate_change_overlay.write(output_dir, &format!("{}_cc", name))?,
        bounds,
    })
}

#[cfg(test)]
mod tests {
    use testdir::testdir;

    use super::{comparison_filenames, render_comparison, render_overlay, RasterStyle};
    use crate::{color::legend::Legend, geometry::extent::Extent, raster::grid::RasterGrid};

    fn grid(values: Vec<f64>) -> RasterGrid {
        RasterGrid::new(2, 2, values, Extent::new(-97.0, 16.5, -96.0, 17.5), None).unwrap()
    }

    #[test]
    fn test_style_from_yaml() {
        let style: RasterStyle =
            serde_yaml::from_str("mode: discrete\ncolor_map: '1:#ff0000,2:00ff00'").unwrap();
        assert!(matches!(style, RasterStyle::Discrete { .. }));
        let style: RasterStyle = serde_yaml::from_str("mode: ranges").unwrap();
        assert_eq!(RasterStyle::Ranges { ranges: None }, style);
        let style: RasterStyle =
            serde_yaml::from_str("mode: continuous\nstart_color: '#ffffff'\nend_color: '#006400'")
                .unwrap();
        assert!(matches!(style, RasterStyle::Continuous { colors: None, .. }));
        match serde_yaml::from_str("mode: continuous").unwrap() {
            RasterStyle::Continuous {
                start_color,
                end_color,
                ..
            } => {
                assert_eq!("#004a13", start_color.to_hex());
                assert_eq!("#dc0b00", end_color.to_hex());
            }
            other => panic!("Unexpected style {:?}", other),
        }
    }

    #[test]
    fn test_comparison_writes_both_images() {
        let (current, climate_change) = comparison_filenames("A_Angustifolia");
        assert_eq!("A_Angustifolia_4326.tif", current);
        assert_eq!("A_Angustifolia_CC_4326.tif", climate_change);

        let shifted = RasterGrid::new(
            2,
            2,
            vec![1.0, 2.0, 3.0, 4.0],
            Extent::new(-96.5, 17.0, -95.5, 18.0),
            None,
        )
        .unwrap();
        let dir = testdir!();
        let description = render_comparison(
            &grid(vec![1.0, 2.0, 3.0, 4.0]),
            &shifted,
            &RasterStyle::Ranges { ranges: None },
            "Idoneidad",
            &dir,
            "agave",
        )
        .unwrap();
        assert_eq!("agave_current.png", description.current.image);
        assert_eq!("agave_cc.png", description.climate_change.image);
        assert_eq!([[16.5, -97.0], [18.0, -95.5]], description.bounds);
        assert!(dir.join("agave_current.png").exists());
        assert!(dir.join("agave_cc.png").exists());
    }

    #[test]
    fn test_render_and_write_overlay() {
        let style = RasterStyle::Continuous {
            start_color: "#ffffff".parse().unwrap(),
            end_color: "#ff0000".parse().unwrap(),
            colors: None,
        };
        let overlay = render_overlay(&grid(vec![2.0, 4.0, -9999.0, 8.0]), &style, "Potencial").unwrap();
        assert_eq!(3, overlay.stats.valid_count);
        assert!(matches!(overlay.legend, Legend::Gradient { min, max, .. } if min == 0.0 && max == 8.0));

        let dir = testdir!();
        let description = overlay.write(&dir, "agave").unwrap();
        assert_eq!("agave.png", description.image);
        assert_eq!([[16.5, -97.0], [17.5, -96.0]], description.bounds);
        assert_eq!(0.8, description.opacity);
        assert_eq!(overlay.png, std::fs::read(dir.join("agave.png")).unwrap());
    }

    #[test]
    fn test_render_all_invalid_raster_fails() {
        let style = RasterStyle::Ranges { ranges: None };
        let err = render_overlay(&grid(vec![-9999.0; 4]), &style, "Potencial").unwrap_err();
        assert!(err.to_string().contains("no valid data"));
    }

    #[test]
    fn test_render_constant_continuous_raster_fails() {
        let style = RasterStyle::Continuous {
            start_color: "#ffffff".parse().unwrap(),
            end_color: "#ff0000".parse().unwrap(),
            colors: None,
        };
        let err = render_overlay(&grid(vec![0.0; 4]), &style, "Potencial").unwrap_err();
        assert!(err.to_string().contains("constant"));
    }
}
