use std::path::Path;

use anyhow::{anyhow, Context};

use crate::{geofile::source::DataSource, geometry::extent::Extent};

/// A single decoded raster band in row-major order, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
    pub extent: Extent,
    /// No-data value declared by the band, if any.
    pub no_data: Option<f64>,
}

impl RasterGrid {
    pub fn new(
        width: usize,
        height: usize,
        values: Vec<f64>,
        extent: Extent,
        no_data: Option<f64>,
    ) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("The raster data is empty ({}x{})", width, height));
        }
        if values.len() != width * height {
            return Err(anyhow!(
                "Raster of {}x{} needs {} values, got {}",
                width,
                height,
                width * height,
                values.len()
            ));
        }
        if !extent.is_finite() {
            return Err(anyhow!("The raster bounds are not valid: {:?}", extent));
        }
        Ok(Self {
            width,
            height,
            values,
            extent,
            no_data,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Extent covered by a raster given its GDAL affine geotransform.
///
/// All four corners are transformed so rotated or south-up rasters still produce a proper
/// min/max box.
pub fn extent_from_geo_transform(geo_transform: &[f64; 6], width: usize, height: usize) -> Extent {
    let corner = |column: f64, row: f64| {
        (
            geo_transform[0] + column * geo_transform[1] + row * geo_transform[2],
            geo_transform[3] + column * geo_transform[4] + row * geo_transform[5],
        )
    };
    let (width, height) = (width as f64, height as f64);
    let corners = [
        corner(0.0, 0.0),
        corner(width, 0.0),
        corner(0.0, height),
        corner(width, height),
    ];
    corners.iter().skip(1).fold(
        Extent::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1),
        |extent, (x, y)| extent.union(&Extent::new(*x, *y, *x, *y)),
    )
}

/// Decode the first band of a raster file with GDAL.
pub fn read_raster_grid(filepath: &Path) -> anyhow::Result<RasterGrid> {
    gdal::DriverManager::register_all();
    let dataset = gdal::Dataset::open(filepath)
        .with_context(|| format!("Error opening raster {:?}", filepath))?;
    if dataset.raster_count() < 1 {
        return Err(anyhow!("No raster bands found in {:?}", filepath));
    }
    let (width, height) = dataset.raster_size();
    let geo_transform = dataset
        .geo_transform()
        .with_context(|| format!("Error reading the bounds of {:?}", filepath))?;
    let band = dataset.rasterband(1)?;
    let buffer = band
        .read_as::<f64>((0, 0), (width, height), (width, height), None)
        .with_context(|| format!("Error reading raster data from {:?}", filepath))?;
    log::debug!(
        "Raster {:?} is {}x{}, no-data {:?}",
        filepath,
        width,
        height,
        band.no_data_value()
    );

    RasterGrid::new(
        width,
        height,
        buffer.data,
        extent_from_geo_transform(&geo_transform, width, height),
        band.no_data_value(),
    )
}

/// Fetch (or reuse the cached copy of) a raster source and decode it.
pub fn load_raster_grid(source: &DataSource, data_dir: &Path) -> anyhow::Result<RasterGrid> {
    let filepath = source.sync_to_file(data_dir)?;
    let grid = read_raster_grid(&filepath)?;
    log::info!(
        "Read {}x{} raster from {:?}",
        grid.width,
        grid.height,
        filepath
    );
    Ok(grid)
}
