//! Error types for VegScope

use thiserror::Error;

/// Main error type for VegScope operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    /// A step referenced a band the image does not carry.
    #[error("Missing band: {band}")]
    MissingBand { band: String },

    #[error("Invalid property '{key}': {reason}")]
    InvalidProperty { key: String, reason: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Index computation was requested on an image that has not been cloud masked.
    #[error("Image '{image}' has not been cloud masked; mask before computing indices")]
    UnmaskedInput { image: String },

    #[error("Image collection is empty")]
    EmptyCollection,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::MissingBand`].
    pub fn missing_band(band: impl Into<String>) -> Self {
        Error::MissingBand { band: band.into() }
    }
}

/// Result type alias for VegScope operations
pub type Result<T> = std::result::Result<T, Error>;
