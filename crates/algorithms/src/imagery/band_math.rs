//! Per-pixel band math kernels
//!
//! Every spectral step reduces to "combine N co-registered bands pixel by
//! pixel". The kernels here run that loop row-parallel and take care of
//! nodata propagation, so the index formulas stay one-liners.

use ndarray::Array2;
use crate::maybe_rayon::*;
use vegscope_core::raster::Raster;
use vegscope_core::{Error, Result};

/// Denominators with a smaller magnitude are treated as zero.
pub const ZERO_DENOMINATOR: f64 = 1e-10;

/// `num / den`, or NaN when `den` is (numerically) zero.
#[inline]
pub fn safe_ratio(num: f64, den: f64) -> f64 {
    if den.abs() < ZERO_DENOMINATOR {
        f64::NAN
    } else {
        num / den
    }
}

/// Apply a unary function to every valid cell of a raster.
///
/// Nodata cells come out as NaN.
///
/// # Example
/// ```ignore
/// let reflectance = band_math(&b4, |dn| dn / 10_000.0)?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    band_math_n([raster], |[v]| f(v))
}

/// Combine `N` equally shaped bands cell by cell.
///
/// `f` receives the `N` values of one pixel in the order of `bands`. If any
/// input is nodata at that pixel, `f` is not called and the output is NaN.
/// The output takes its georeferencing from `bands[0]`.
///
/// # Errors
/// [`Error::SizeMismatch`] if the bands do not share a shape.
pub fn band_math_n<const N: usize, F>(bands: [&Raster<f64>; N], f: F) -> Result<Raster<f64>>
where
    F: Fn([f64; N]) -> f64 + Sync + Send,
{
    let Some(&template) = bands.first() else {
        return Err(Error::Other("band math needs at least one band".into()));
    };
    for band in &bands[1..] {
        check_dimensions(template, band)?;
    }

    let (rows, cols) = template.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            'cells: for (col, out) in row_data.iter_mut().enumerate() {
                let mut pixel = [0.0; N];
                for (slot, band) in pixel.iter_mut().zip(bands.iter()) {
                    let v = unsafe { band.get_unchecked(row, col) };
                    if band.is_nodata(v) {
                        continue 'cells;
                    }
                    *slot = v;
                }
                *out = f(pixel);
            }
            row_data
        })
        .collect();

    build_output(template, data)
}

/// Number of NaN cells in `output` whose inputs were all valid, i.e. cells
/// where the formula itself was undefined (zero denominator, negative radicand).
pub fn undefined_pixels(output: &Raster<f64>, inputs: &[&Raster<f64>]) -> usize {
    output
        .data()
        .indexed_iter()
        .filter(|(_, v)| v.is_nan())
        .filter(|((row, col), _)| {
            inputs.iter().all(|band| {
                band.get(*row, *col)
                    .map(|v| !band.is_nodata(v))
                    .unwrap_or(false)
            })
        })
        .count()
}

pub(crate) fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

/// Wrap row-major `data` in a NaN-nodata raster georeferenced like `template`.
pub(crate) fn build_output(template: &Raster<f64>, data: Vec<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = template.shape();
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vegscope_core::GeoTransform;

    fn make_band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(5, 5, value);
        r.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_band_math_scale() {
        let input = make_band(5000.0);
        let result = band_math(&input, |v| v * 0.0001).unwrap();
        assert_relative_eq!(result.get(2, 2).unwrap(), 0.5, epsilon = 1e-10);
        assert_eq!(result.transform(), input.transform());
    }

    #[test]
    fn test_band_math_preserves_nan() {
        let mut input = make_band(100.0);
        input.set(2, 2, f64::NAN).unwrap();

        let result = band_math(&input, |v| v * 2.0).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
        assert_relative_eq!(result.get(0, 0).unwrap(), 200.0);
    }

    #[test]
    fn test_band_math_n_respects_declared_nodata() {
        let mut a = make_band(3.0);
        a.set_nodata(Some(-9999.0));
        a.set(1, 1, -9999.0).unwrap();
        let b = make_band(7.0);

        let result = band_math_n([&a, &b], |[x, y]| x + y).unwrap();
        assert_relative_eq!(result.get(0, 0).unwrap(), 10.0);
        assert!(result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_band_math_n_dimension_mismatch() {
        let a = make_band(1.0);
        let b = Raster::filled(5, 6, 1.0);
        assert!(matches!(
            band_math_n([&a, &b], |[x, y]| x * y),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_safe_ratio_zero_denominator() {
        assert!(safe_ratio(1.0, 0.0).is_nan());
        assert!(safe_ratio(0.0, 1e-12).is_nan());
        assert_relative_eq!(safe_ratio(1.0, 4.0), 0.25);
    }

    #[test]
    fn test_undefined_pixels_ignores_nodata_inputs() {
        let mut a = make_band(0.0);
        a.set(0, 0, f64::NAN).unwrap();
        let b = make_band(0.0);

        // 0/0 everywhere; (0, 0) is NaN because of its input, not the formula
        let result = band_math_n([&a, &b], |[x, y]| safe_ratio(x - y, x + y)).unwrap();
        assert_eq!(undefined_pixels(&result, &[&a, &b]), 24);
    }
}
