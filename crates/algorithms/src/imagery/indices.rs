//! Spectral vegetation, moisture and soil indices
//!
//! Two layers: raster functions (`ndvi`, `msavi`, ...) taking one raster per
//! band, and image steps (`add_ndvi`, `add_msavi`, ...) that look the bands
//! up by their Sentinel-2 names and append the result as a new band.
//!
//! Undefined results (zero denominator, negative MSAVI radicand) are NaN,
//! the same sentinel used for masked pixels.

use super::band_math::{band_math_n, safe_ratio};
use super::bands;
use vegscope_core::raster::Raster;
use vegscope_core::{Image, Result};

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative inputs. Pixels where the
/// sum is zero, or either band is nodata, are NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_n([band_a, band_b], |[a, b]| safe_ratio(a - b, a + b))
}

// ---------------------------------------------------------------------------
// NDVI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

// ---------------------------------------------------------------------------
// NDMI
// ---------------------------------------------------------------------------

/// Normalized Difference Moisture Index (Gao, 1996)
///
/// `NDMI = (NIR - SWIR) / (NIR + SWIR)`
///
/// Tracks canopy water content; drops under drought stress before NDVI does.
pub fn ndmi(nir: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, swir)
}

// ---------------------------------------------------------------------------
// MSAVI
// ---------------------------------------------------------------------------

/// What to do when the MSAVI radicand `(2*NIR + 1)^2 - 8*(NIR - Red)` is negative.
///
/// The radicand equals `(2*NIR - 1)^2 + 8*Red`, so it only goes negative for
/// negative red reflectance (over-corrected dark pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadicandPolicy {
    /// Produce NaN
    #[default]
    Nan,
    /// Treat the radicand as zero, giving `0.5 * (2*NIR + 1)`
    ClampZero,
}

/// Parameters for MSAVI
#[derive(Debug, Clone, Copy, Default)]
pub struct MsaviParams {
    pub radicand: RadicandPolicy,
}

/// Modified Soil Adjusted Vegetation Index (Qi et al., 1994)
///
/// `MSAVI = 0.5 * (2*NIR + 1 - sqrt((2*NIR + 1)^2 - 8*(NIR - Red)))`
///
/// Self-adjusting version of SAVI, no L factor to choose. Unlike the
/// normalized differences it is not bounded to [-1, 1] and not scale
/// invariant: feed it reflectance, not digital numbers.
pub fn msavi(nir: &Raster<f64>, red: &Raster<f64>, params: MsaviParams) -> Result<Raster<f64>> {
    band_math_n([nir, red], |[n, r]| msavi_pixel(n, r, params.radicand))
}

#[inline]
fn msavi_pixel(nir: f64, red: f64, policy: RadicandPolicy) -> f64 {
    let t = 2.0 * nir + 1.0;
    let radicand = t * t - 8.0 * (nir - red);
    if radicand < 0.0 {
        return match policy {
            RadicandPolicy::Nan => f64::NAN,
            RadicandPolicy::ClampZero => 0.5 * t,
        };
    }
    0.5 * (t - radicand.sqrt())
}

// ---------------------------------------------------------------------------
// BSI
// ---------------------------------------------------------------------------

/// Bare Soil Index
///
/// `BSI = ((SWIR + Red) - (NIR + Blue)) / ((SWIR + Red) + (NIR + Blue))`
///
/// High values indicate bare soil.
pub fn bsi(
    swir: &Raster<f64>,
    red: &Raster<f64>,
    nir: &Raster<f64>,
    blue: &Raster<f64>,
) -> Result<Raster<f64>> {
    band_math_n([swir, red, nir, blue], |[sw, r, n, b]| {
        let soil = sw + r;
        let veg = n + b;
        safe_ratio(soil - veg, soil + veg)
    })
}

// ---------------------------------------------------------------------------
// Image steps
// ---------------------------------------------------------------------------

/// Append `NDVI` computed from `B8` and `B4`.
///
/// # Errors
/// `MissingBand` if `B8` or `B4` is absent.
pub fn add_ndvi(image: &Image) -> Result<Image> {
    let [nir, red] = image.select_many([bands::NIR, bands::RED])?;
    image.with_band(bands::NDVI, ndvi(nir, red)?)
}

/// Append `NDMI` computed from `B8` and `B11`.
pub fn add_ndmi(image: &Image) -> Result<Image> {
    let [nir, swir] = image.select_many([bands::NIR, bands::SWIR1])?;
    image.with_band(bands::NDMI, ndmi(nir, swir)?)
}

/// Append `MSAVI` computed from `B8` and `B4`, NaN for negative radicands.
pub fn add_msavi(image: &Image) -> Result<Image> {
    add_msavi_with(image, MsaviParams::default())
}

pub fn add_msavi_with(image: &Image, params: MsaviParams) -> Result<Image> {
    let [nir, red] = image.select_many([bands::NIR, bands::RED])?;
    image.with_band(bands::MSAVI, msavi(nir, red, params)?)
}

/// Append `BSI` computed from `B2`, `B4`, `B8` and `B11`.
pub fn add_bsi(image: &Image) -> Result<Image> {
    let [swir, red, nir, blue] =
        image.select_many([bands::SWIR1, bands::RED, bands::NIR, bands::BLUE])?;
    image.with_band(bands::BSI, bsi(swir, red, nir, blue)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
