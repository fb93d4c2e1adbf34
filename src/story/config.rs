use std::{collections::HashSet, fs::read_to_string, path::{Path, PathBuf}};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use super::{cards::Card, fade::FadeInBox};
use crate::{
    raster::overlay::{comparison_filenames, RasterStyle},
    render::{choropleth::ChoroplethConfig, heatmap::HeatmapConfig, time_series::TimeSeriesConfig},
};

pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RasterConfig {
    pub source: String,
    pub title: String,
    pub style: RasterStyle,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ComparisonConfig {
    /// Species prefix of the `<species>_4326.tif` and `<species>_CC_4326.tif` rasters.
    pub species: String,
    pub title: String,
    pub style: RasterStyle,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Visualization {
    Heatmap(HeatmapConfig),
    Choropleth(ChoroplethConfig),
    Raster(RasterConfig),
    Comparison(ComparisonConfig),
    TimeSeries(TimeSeriesConfig),
}

impl Visualization {
    pub fn kind(&self) -> &'static str {
        match self {
            Visualization::Heatmap(_) => "heatmap",
            Visualization::Choropleth(_) => "choropleth",
            Visualization::Raster(_) => "raster",
            Visualization::Comparison(_) => "comparison",
            Visualization::TimeSeries(_) => "time_series",
        }
    }

    /// Data references the visualization reads.
    pub fn sources(&self) -> Vec<String> {
        match self {
            Visualization::Heatmap(heatmap) => vec![heatmap.source.clone()],
            Visualization::Choropleth(choropleth) => vec![choropleth.source.clone()],
            Visualization::Raster(raster) => vec![raster.source.clone()],
            Visualization::Comparison(comparison) => {
                let (current, climate_change) = comparison_filenames(&comparison.species);
                vec![current, climate_change]
            }
            Visualization::TimeSeries(time_series) => vec![time_series.source.clone()],
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SectionConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub fade_boxes: Vec<FadeInBox>,
    pub visualization: Visualization,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct StoryConfig {
    #[serde(default)]
    pub title: Option<String>,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Prefix for data references that are not URLs. Relative to the config file when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_tile_url")]
    pub tile_url: String,
    pub sections: Vec<SectionConfig>,
}

fn default_tile_url() -> String {
    DEFAULT_TILE_URL.to_owned()
}

impl StoryConfig {
    /// Section ids name output files, so they must be unique, non-empty file name stems.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.id.is_empty()
                || section
                    .id
                    .chars()
                    .any(|c| !(c.is_alphanumeric() || c == '_' || c == '-'))
            {
                return Err(anyhow!(
                    "Section id '{}' must be non-empty and only use letters, digits, '_' or '-'",
                    section.id
                ));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(anyhow!("Duplicate section id '{}'", section.id));
            }
        }
        Ok(())
    }

    /// Read and validate a story file. Relative data and output directories are taken
    /// relative to the file.
    pub fn from_file(filepath: &Path) -> anyhow::Result<Self> {
        let contents =
            read_to_string(filepath).with_context(|| format!("Reading config {:?}", filepath))?;
        let mut config: StoryConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Parsing config {:?}", filepath))?;
        let base_dir = filepath.parent().unwrap_or_else(|| Path::new(""));
        config.data_dir = base_dir.join(&config.data_dir);
        config.output_dir = base_dir.join(&config.output_dir);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use testdir::testdir;

    use super::{StoryConfig, Visualization, DEFAULT_TILE_URL};
    use crate::{raster::overlay::RasterStyle, render::choropleth::Delimitation};

    const STORY: &str = r#"
title: Tierra de Agaves
data_dir: data
output_dir: out
base_url: https://example.org/datos
sections:
  - id: poblacion
    title: Población
    cards:
      - title: Población total
        description: Habitantes por municipio
        metrics:
          - value: "45,210"
            label: habitantes
    visualization:
      kind: heatmap
      source: poblacion.geojson
      value_column: POB_TOTAL
  - id: clima
    title: Clima
    subtitle: Tipos de clima
    fade_boxes:
      - text: El clima semiárido domina los valles
        position: center
    visualization:
      kind: choropleth
      source: clima.geojson
      delimitation: PAISAJE
      group_borders: true
  - id: potencial
    title: Potencial productivo
    visualization:
      kind: raster
      source: potencial.tif
      title: Potencial
      style:
        mode: ranges
  - id: idoneidad
    title: Cambio climático
    visualization:
      kind: comparison
      species: A_Angustifolia
      title: Idoneidad
      style:
        mode: continuous
  - id: cambios
    title: Cambio de uso de suelo
    visualization:
      kind: time_series
      source: CUS_cambios.geojson
      scale: paisaje
"#;

    #[test]
    fn test_read_story() {
        let dir = testdir!();
        let filepath = dir.join("story.yaml");
        fs::write(&filepath, STORY).unwrap();
        let config = StoryConfig::from_file(&filepath).unwrap();
        assert_eq!(dir.join("data"), config.data_dir);
        assert_eq!(dir.join("out"), config.output_dir);
        assert_eq!(DEFAULT_TILE_URL, config.tile_url);
        assert_eq!(5, config.sections.len());

        let kinds: Vec<&str> = config
            .sections
            .iter()
            .map(|section| section.visualization.kind())
            .collect();
        assert_eq!(
            vec!["heatmap", "choropleth", "raster", "comparison", "time_series"],
            kinds
        );
        assert_eq!(
            vec!["A_Angustifolia_4326.tif", "A_Angustifolia_CC_4326.tif"],
            config.sections[3].visualization.sources()
        );
        assert_eq!(1, config.sections[0].cards.len());
        assert!(config.sections[1].cards.is_empty());
        match &config.sections[1].visualization {
            Visualization::Choropleth(choropleth) => {
                assert_eq!(Delimitation::Landscape, choropleth.delimitation);
                assert!(choropleth.group_borders);
            }
            other => panic!("Unexpected visualization {:?}", other),
        }
        match &config.sections[2].visualization {
            Visualization::Raster(raster) => {
                assert_eq!(RasterStyle::Ranges { ranges: None }, raster.style)
            }
            other => panic!("Unexpected visualization {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_section_ids_are_rejected() {
        let story = STORY.replace("id: clima", "id: poblacion");
        let config: StoryConfig = serde_yaml::from_str(&story).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate"), "{}", err);
    }

    #[test]
    fn test_section_ids_must_be_file_stems() {
        let story = STORY.replace("id: clima", "id: ../clima");
        let config: StoryConfig = serde_yaml::from_str(&story).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_visualization_is_rejected() {
        let story = STORY.replace("kind: heatmap", "kind: contour");
        assert!(serde_yaml::from_str::<StoryConfig>(&story).is_err());
    }
}
