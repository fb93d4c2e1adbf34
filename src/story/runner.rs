use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use rayon::prelude::*;
use serde::Serialize;

use super::{
    config::{SectionConfig, StoryConfig, Visualization},
    manifest::{SectionEntry, StoryManifest},
};
use crate::{
    geofile::{geojson::load_feature_collection, source::DataSource},
    raster::{
        grid::load_raster_grid,
        overlay::{comparison_filenames, render_comparison, render_overlay},
    },
    render::{
        choropleth::render_choropleth, heatmap::render_heatmap, time_series::render_time_series,
    },
};

/// Renders every section of a story into its output directory.
pub struct StoryRunner<'a> {
    config: &'a StoryConfig,
    base_dir: PathBuf,
}

/// Wraps a section's artifact description with the section it belongs to.
#[derive(Serialize)]
struct Sidecar<'a, T: Serialize> {
    id: &'a str,
    title: &'a str,
    kind: &'static str,
    #[serde(flatten)]
    description: T,
}

impl<'a> StoryRunner<'a> {
    /// `base_dir` is where relative data references are looked up when no base URL is set.
    pub fn new(config: &'a StoryConfig, base_dir: &Path) -> Self {
        Self {
            config,
            base_dir: base_dir.to_path_buf(),
        }
    }

    fn source(&self, reference: &str) -> DataSource {
        DataSource::resolve(reference, self.config.base_url.as_deref(), &self.base_dir)
    }

    /// Download every remote source once, one after another, so sections rendering in parallel
    /// only read from the cache. Failures are left for the section to report.
    fn prefetch_sources(&self) {
        let mut seen = HashSet::new();
        for section in &self.config.sections {
            for reference in section.visualization.sources() {
                let source = self.source(&reference);
                if !matches!(source, DataSource::Url(_)) || !seen.insert(source.clone()) {
                    continue;
                }
                if let Err(err) = source.sync_to_file(&self.config.data_dir) {
                    log::warn!("Could not prefetch {:?}: {:#}", source, err);
                }
            }
        }
    }

    fn write_sidecar<T: Serialize>(
        &self,
        section: &SectionConfig,
        description: T,
    ) -> anyhow::Result<String> {
        let filename = format!("{}.yaml", section.id);
        let sidecar = Sidecar {
            id: &section.id,
            title: &section.title,
            kind: section.visualization.kind(),
            description,
        };
        let filepath = self.config.output_dir.join(&filename);
        fs::write(&filepath, serde_yaml::to_string(&sidecar)?)
            .with_context(|| format!("Writing {:?}", filepath))?;
        Ok(filename)
    }

    /// Load a section's data, render it and write its artifacts. Returns the sidecar file name.
    pub fn render_section(&self, section: &SectionConfig) -> anyhow::Result<String> {
        let data_dir = &self.config.data_dir;
        let output_dir = &self.config.output_dir;
        let name = section.id.as_str();
        match &section.visualization {
            Visualization::Heatmap(heatmap) => {
                let collection = load_feature_collection(&self.source(&heatmap.source), data_dir)?;
                let description = render_heatmap(&collection, heatmap)?.write(output_dir, name)?;
                self.write_sidecar(section, description)
            }
            Visualization::Choropleth(choropleth) => {
                let collection =
                    load_feature_collection(&self.source(&choropleth.source), data_dir)?;
                let description = render_choropleth(&collection, choropleth).write(
                    output_dir,
                    name,
                    choropleth,
                    &collection,
                )?;
                self.write_sidecar(section, description)
            }
            Visualization::Raster(raster) => {
                let grid = load_raster_grid(&self.source(&raster.source), data_dir)?;
                let description =
                    render_overlay(&grid, &raster.style, &raster.title)?.write(output_dir, name)?;
                self.write_sidecar(section, description)
            }
            Visualization::Comparison(comparison) => {
                let (current, climate_change) = comparison_filenames(&comparison.species);
                let current = load_raster_grid(&self.source(&current), data_dir)?;
                let climate_change = load_raster_grid(&self.source(&climate_change), data_dir)?;
                let description = render_comparison(
                    &current,
                    &climate_change,
                    &comparison.style,
                    &comparison.title,
                    output_dir,
                    name,
                )?;
                self.write_sidecar(section, description)
            }
            Visualization::TimeSeries(time_series) => {
                let collection =
                    load_feature_collection(&self.source(&time_series.source), data_dir)?;
                let description = render_time_series(&collection, time_series).write(
                    output_dir,
                    name,
                    time_series,
                )?;
                self.write_sidecar(section, description)
            }
        }
    }

    /// Render all sections and write the manifest. A failing section is logged and recorded in
    /// the manifest; the others still render.
    pub fn run(&self) -> anyhow::Result<StoryManifest> {
        fs::create_dir_all(&self.config.data_dir)
            .with_context(|| format!("Creating data dir {:?}", self.config.data_dir))?;
        fs::create_dir_all(&self.config.output_dir)
            .with_context(|| format!("Creating output dir {:?}", self.config.output_dir))?;
        self.prefetch_sources();
        log::info!("Rendering {} sections", self.config.sections.len());

        let entries: Vec<SectionEntry> = self
            .config
            .sections
            .par_iter()
            .map(|section| match self.render_section(section) {
                Ok(sidecar) => {
                    log::info!("Rendered section {}", section.id);
                    SectionEntry::rendered(section, sidecar)
                }
                Err(err) => {
                    log::error!("Section {} failed: {:?}", section.id, err);
                    SectionEntry::failed(section, &err)
                }
            })
            .collect();

        let manifest = StoryManifest::new(self.config, entries);
        manifest.write(&self.config.output_dir)?;
        if manifest.failed_count() > 0 {
            log::warn!(
                "{} of {} sections failed to render",
                manifest.failed_count(),
                manifest.sections.len()
            );
        }
        Ok(manifest)
    }
}
