pub mod choropleth;
pub mod heatmap;
pub mod style;
pub mod time_series;
