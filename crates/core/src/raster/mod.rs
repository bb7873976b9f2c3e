//! Raster data structures

mod element;
mod geotransform;
mod grid;

pub use element::RasterElement;
pub use geotransform::{BBox, GeoTransform};
pub use grid::{Raster, RasterStatistics};
