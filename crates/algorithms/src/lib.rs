//! # VegScope Algorithms
//!
//! Preprocessing for multispectral satellite imagery.
//!
//! ## Modules
//!
//! - **imagery**: cloud masking, spectral indices (NDVI, NDMI, MSAVI, BSI), pipelines
//! - **collection**: filtering image collections and compositing them

pub mod collection;
pub mod imagery;
mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::collection::{composite, ImageCollection, Reducer};
    pub use crate::imagery::{
        add_bsi, add_msavi, add_ndmi, add_ndvi, cloud_mask, mask_clouds, CloudMaskParams,
        MsaviParams, Pipeline, RadicandPolicy, SpectralIndex, UndefinedResultWarning,
    };
    pub use vegscope_core::prelude::*;
}
