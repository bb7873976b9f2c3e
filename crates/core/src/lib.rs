//! # VegScope Core
//!
//! Core types and I/O for the VegScope imagery pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: a georeferenced 2D grid holding one band
//! - `Image`: named bands sharing one grid, plus scene properties
//! - `GeoTransform`, `BBox`, `CRS`: georeferencing
//! - GeoTIFF and scene manifest I/O

pub mod crs;
pub mod error;
pub mod image;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use image::{Image, Radiometry};
pub use raster::{BBox, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::image::{properties, Image, Radiometry};
    pub use crate::raster::{BBox, GeoTransform, Raster, RasterElement};
}
