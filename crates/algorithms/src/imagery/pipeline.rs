//! Composable preprocessing pipeline
//!
//! A [`Pipeline`] is an optional cloud mask followed by any number of
//! spectral indices. The mask always runs first, whatever order the builder
//! calls came in, so indices are computed on clear reflectance.
//!
//! ```ignore
//! let pipeline = Pipeline::new()
//!     .mask(CloudMaskParams::default())
//!     .index(SpectralIndex::Ndvi)
//!     .index(SpectralIndex::Bsi);
//! let processed = pipeline.apply_collection(&collection)?;
//! ```

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use super::band_math::undefined_pixels;
use super::bands;
use super::cloud_mask::{cloud_mask, CloudMaskParams};
use super::indices::{bsi, msavi, ndmi, ndvi, MsaviParams};
use crate::collection::ImageCollection;
use vegscope_core::raster::Raster;
use vegscope_core::{Error, Image, Result};

/// The closed set of indices the pipeline can derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Moisture Index
    Ndmi,
    /// Modified Soil Adjusted Vegetation Index
    Msavi,
    /// Bare Soil Index
    Bsi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 4] = [Self::Ndvi, Self::Ndmi, Self::Msavi, Self::Bsi];

    /// Name of the band the index is written to
    pub fn name(self) -> &'static str {
        match self {
            Self::Ndvi => bands::NDVI,
            Self::Ndmi => bands::NDMI,
            Self::Msavi => bands::MSAVI,
            Self::Bsi => bands::BSI,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Ndvi => "Normalized Difference Vegetation Index",
            Self::Ndmi => "Normalized Difference Moisture Index",
            Self::Msavi => "Modified Soil Adjusted Vegetation Index",
            Self::Bsi => "Bare Soil Index",
        }
    }

    /// Source bands the index reads
    pub fn required_bands(self) -> &'static [&'static str] {
        match self {
            Self::Ndvi | Self::Msavi => &[bands::NIR, bands::RED],
            Self::Ndmi => &[bands::NIR, bands::SWIR1],
            Self::Bsi => &[bands::BLUE, bands::RED, bands::NIR, bands::SWIR1],
        }
    }

    /// Guaranteed output range, `None` when the index is unbounded
    pub fn value_range(self) -> Option<(f64, f64)> {
        match self {
            Self::Msavi => None,
            _ => Some((-1.0, 1.0)),
        }
    }

    /// Compute the index band without attaching it to the image.
    pub fn compute(self, image: &Image, msavi_params: MsaviParams) -> Result<Raster<f64>> {
        match self {
            Self::Ndvi => {
                let [nir, red] = image.select_many([bands::NIR, bands::RED])?;
                ndvi(nir, red)
            }
            Self::Ndmi => {
                let [nir, swir] = image.select_many([bands::NIR, bands::SWIR1])?;
                ndmi(nir, swir)
            }
            Self::Msavi => {
                let [nir, red] = image.select_many([bands::NIR, bands::RED])?;
                msavi(nir, red, msavi_params)
            }
            Self::Bsi => {
                let [swir, red, nir, blue] =
                    image.select_many([bands::SWIR1, bands::RED, bands::NIR, bands::BLUE])?;
                bsi(swir, red, nir, blue)
            }
        }
    }

    /// Copy of `image` with this index appended, default parameters.
    pub fn apply(self, image: &Image) -> Result<Image> {
        image.with_band(self.name(), self.compute(image, MsaviParams::default())?)
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    /// Accepts the band name (`"ndvi"`, `"NDVI"`) or the full title, case-insensitive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|idx| {
                idx.name().eq_ignore_ascii_case(wanted) || idx.title().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::InvalidParameter {
                name: "index",
                value: s.to_string(),
                reason: "expected one of NDVI, NDMI, MSAVI, BSI".into(),
            })
    }
}

/// Advisory: an index came out undefined (NaN) on pixels whose inputs were valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedResultWarning {
    pub image: String,
    pub band: String,
    pub pixels: usize,
}

impl fmt::Display for UndefinedResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} undefined on {} valid pixel(s)",
            self.image, self.band, self.pixels
        )
    }
}

/// Cloud mask + spectral indices, applied image by image.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    mask: Option<CloudMaskParams>,
    indices: Vec<SpectralIndex>,
    msavi: MsaviParams,
    allow_unmasked: bool,
}

impl Pipeline {
    /// Empty pipeline: no mask, no indices
    pub fn new() -> Self {
        Self::default()
    }

    /// Default Sentinel-2 cloud mask followed by `indices`
    pub fn sentinel2<I: IntoIterator<Item = SpectralIndex>>(indices: I) -> Self {
        Self::new().mask(CloudMaskParams::default()).indices(indices)
    }

    pub fn mask(mut self, params: CloudMaskParams) -> Self {
        self.mask = Some(params);
        self
    }

    /// Add an index; adding the same index twice has no effect.
    pub fn index(mut self, index: SpectralIndex) -> Self {
        if !self.indices.contains(&index) {
            self.indices.push(index);
        }
        self
    }

    pub fn indices<I: IntoIterator<Item = SpectralIndex>>(self, indices: I) -> Self {
        indices.into_iter().fold(self, Self::index)
    }

    pub fn msavi_params(mut self, params: MsaviParams) -> Self {
        self.msavi = params;
        self
    }

    /// Let a pipeline without a mask step run on raw images.
    pub fn allow_unmasked(mut self) -> Self {
        self.allow_unmasked = true;
        self
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn index_list(&self) -> &[SpectralIndex] {
        &self.indices
    }

    /// Run the pipeline on one image.
    ///
    /// # Errors
    /// - `MissingBand` if the QA band or a band an index needs is absent
    /// - `UnmaskedInput` if there is no mask step, the image is raw and
    ///   [`allow_unmasked`](Self::allow_unmasked) was not set
    pub fn apply(&self, image: &Image) -> Result<Image> {
        self.apply_with_report(image).map(|(image, _)| image)
    }

    /// Like [`apply`](Self::apply), also returning undefined-result advisories.
    pub fn apply_with_report(&self, image: &Image) -> Result<(Image, Vec<UndefinedResultWarning>)> {
        let masked = match &self.mask {
            Some(params) => cloud_mask(image, params)?,
            None if image.is_masked() || self.allow_unmasked => image.clone(),
            None => {
                return Err(Error::UnmaskedInput {
                    image: image.id().to_string(),
                })
            }
        };

        // Indices only read source bands, so every index sees `masked`.
        let mut out = masked.clone();
        let mut warnings = Vec::new();
        for &index in &self.indices {
            let band = index.compute(&masked, self.msavi)?;

            let inputs = index
                .required_bands()
                .iter()
                .map(|name| masked.select(name))
                .collect::<Result<Vec<_>>>()?;
            let undefined = undefined_pixels(&band, &inputs);
            if undefined > 0 {
                let warning = UndefinedResultWarning {
                    image: image.id().to_string(),
                    band: index.name().to_string(),
                    pixels: undefined,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }

            debug!(image = image.id(), index = index.name(), "index computed");
            out.add_band(index.name(), band)?;
        }

        Ok((out, warnings))
    }

    /// Run the pipeline on every image of a collection, in parallel.
    pub fn apply_collection(&self, collection: &ImageCollection) -> Result<ImageCollection> {
        collection.map(|image| self.apply(image))
    }
}
