//! Imagery preprocessing for Sentinel-2 style scenes
//!
//! - Cloud/cirrus masking from the `QA60` bitmask, with reflectance scaling
//! - Spectral indices: NDVI, NDMI, MSAVI, BSI
//! - Band math kernels shared by the above
//! - [`Pipeline`]: mask + indices as one reusable step

mod band_math;
pub mod bands;
mod cloud_mask;
mod indices;
mod pipeline;

pub use band_math::{band_math, band_math_n, safe_ratio, undefined_pixels, ZERO_DENOMINATOR};
pub(crate) use band_math::{build_output, check_dimensions};
pub use cloud_mask::{cloud_mask, is_clear, mask_clouds, qa_valid_mask, CloudMaskParams};
pub use indices::{
    add_bsi, add_msavi, add_msavi_with, add_ndmi, add_ndvi, bsi, msavi, ndmi, ndvi,
    normalized_difference, MsaviParams, RadicandPolicy,
};
pub use pipeline::{Pipeline, SpectralIndex, UndefinedResultWarning};
