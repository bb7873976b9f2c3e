//! Cloud and cirrus masking from the Sentinel-2 `QA60` bitmask
//!
//! A pixel is clear when both the opaque-cloud bit (10) and the cirrus bit
//! (11) of `QA60` are zero. Masking sets every band to NaN on non-clear
//! pixels and scales digital numbers to reflectance.

use tracing::debug;

use super::band_math::{band_math_n, build_output};
use super::bands;
use crate::maybe_rayon::*;
use vegscope_core::raster::Raster;
use vegscope_core::{Error, Image, Radiometry, Result};

/// Parameters for [`cloud_mask`]
#[derive(Debug, Clone, PartialEq)]
pub struct CloudMaskParams {
    /// Name of the quality bitmask band. It is masked but never scaled.
    pub qa_band: String,
    /// Bit flagging opaque clouds
    pub cloud_bit: u8,
    /// Bit flagging cirrus
    pub cirrus_bit: u8,
    /// Divisor turning digital numbers into reflectance
    pub scale_factor: f64,
}

impl Default for CloudMaskParams {
    fn default() -> Self {
        Self {
            qa_band: bands::QA60.to_string(),
            cloud_bit: 10,
            cirrus_bit: 11,
            scale_factor: 10_000.0,
        }
    }
}

impl CloudMaskParams {
    fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "scale_factor",
                value: self.scale_factor.to_string(),
                reason: "must be a positive finite number".into(),
            });
        }
        for (name, bit) in [("cloud_bit", self.cloud_bit), ("cirrus_bit", self.cirrus_bit)] {
            if bit >= 32 {
                return Err(Error::InvalidParameter {
                    name,
                    value: bit.to_string(),
                    reason: "QA bitmasks are at most 32 bits wide".into(),
                });
            }
        }
        Ok(())
    }

    fn flag_bits(&self) -> u32 {
        (1u32 << self.cloud_bit) | (1u32 << self.cirrus_bit)
    }
}

/// Whether a single QA value marks a clear pixel.
///
/// NaN, negative, fractional or out-of-range values are never clear.
pub fn is_clear(qa: f64, params: &CloudMaskParams) -> bool {
    if !qa.is_finite() || qa < 0.0 || qa.fract() != 0.0 || qa > u32::MAX as f64 {
        return false;
    }
    (qa as u32) & params.flag_bits() == 0
}

/// Per-pixel validity of a QA band: 1 = clear, 0 = cloud, cirrus or nodata.
pub fn qa_valid_mask(qa: &Raster<f64>, params: &CloudMaskParams) -> Result<Raster<u8>> {
    params.validate()?;

    let (rows, cols) = qa.shape();
    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let v = unsafe { qa.get_unchecked(row, col) };
                    u8::from(!qa.is_nodata(v) && is_clear(v, params))
                })
                .collect::<Vec<u8>>()
        })
        .collect();

    qa.with_data(data)
}

/// Mask clouds and cirrus with default Sentinel-2 parameters.
///
/// See [`cloud_mask`].
pub fn mask_clouds(image: &Image) -> Result<Image> {
    cloud_mask(image, &CloudMaskParams::default())
}

/// Mask cloudy pixels in every band and scale to reflectance.
///
/// - Non-clear pixels become NaN in all bands, the QA band included.
/// - Every band except the QA band is divided by `scale_factor`.
/// - Properties are carried over unchanged.
///
/// Scaling happens once: an image that is already [`Radiometry::Reflectance`]
/// is re-masked but not divided again, so masking is idempotent.
///
/// # Errors
/// `MissingBand` if the QA band is absent.
pub fn cloud_mask(image: &Image, params: &CloudMaskParams) -> Result<Image> {
    let qa = image.select(&params.qa_band)?;
    let clear = qa_valid_mask(qa, params)?;
    let clear_count = clear.data().iter().filter(|&&v| v == 1).count();

    let scale = if image.is_masked() {
        debug!(image = image.id(), "already in reflectance, skipping scaling");
        1.0
    } else {
        params.scale_factor
    };

    let mut out = Image::new(image.id());
    out.copy_properties(image);
    out.set_radiometry(Radiometry::Reflectance);

    for (name, band) in image.bands() {
        let divisor = if name == params.qa_band { 1.0 } else { scale };
        out.add_band(name, apply_mask(band, &clear, divisor)?)?;
    }

    debug!(
        image = image.id(),
        clear = clear_count,
        total = clear.len(),
        "cloud mask applied"
    );
    Ok(out)
}

fn apply_mask(band: &Raster<f64>, clear: &Raster<u8>, divisor: f64) -> Result<Raster<f64>> {
    if band.shape() != clear.shape() {
        return Err(Error::SizeMismatch {
            er: clear.rows(),
            ec: clear.cols(),
            ar: band.rows(),
            ac: band.cols(),
        });
    }

    let masked = band_math_n([band], |[v]| v / divisor)?;
    let data: Vec<f64> = masked
        .data()
        .iter()
        .zip(clear.data().iter())
        .map(|(&v, &ok)| if ok == 1 { v } else { f64::NAN })
        .collect();

    build_output(band, data)
}
