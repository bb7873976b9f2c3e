//! Pixel-wise temporal compositing
//!
//! Reduces the co-registered images of a collection to one image, band by
//! band, ignoring no-data samples (NaN or a band's declared no-data value).

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::ImageCollection;
use crate::imagery::{build_output, check_dimensions};
use crate::maybe_rayon::*;
use vegscope_core::image::properties;
use vegscope_core::raster::Raster;
use vegscope_core::{Error, Image, Radiometry, Result};

/// Per-pixel reduction across images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Middle value; mean of the two middle values for an even count
    Median,
    Max,
    Min,
    Mean,
}

impl Reducer {
    pub fn name(self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Max => "max",
            Self::Min => "min",
            Self::Mean => "mean",
        }
    }

    /// Reduce the valid samples of one pixel. `values` is reordered.
    /// An empty slice gives NaN.
    pub fn reduce(self, values: &mut [f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reducer {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "median" => Ok(Self::Median),
            "max" | "maximum" => Ok(Self::Max),
            "min" | "minimum" => Ok(Self::Min),
            "mean" | "avg" | "average" => Ok(Self::Mean),
            _ => Err(Error::InvalidParameter {
                name: "reducer",
                value: s.to_string(),
                reason: "expected median, max, min or mean".into(),
            }),
        }
    }
}

/// Composite a collection into one image.
///
/// Only bands present in every image are reduced, in the order of the first
/// image. The result is georeferenced like the first image, carries a
/// `composite:count` property, and is in reflectance only if every input was.
///
/// # Errors
/// - `EmptyCollection` for an empty collection
/// - `SizeMismatch` if the images are not on the same grid
pub fn composite(collection: &ImageCollection, reducer: Reducer) -> Result<Image> {
    let first = collection.images().first().ok_or(Error::EmptyCollection)?;

    let common: Vec<&str> = first
        .band_names()
        .filter(|name| collection.iter().all(|image| image.has_band(name)))
        .collect();
    if common.is_empty() {
        return Err(Error::Other("images in the collection share no band".into()));
    }

    let mut out = Image::new(format!("{}_composite", reducer));
    for name in common {
        let stack = collection
            .iter()
            .map(|image| image.select(name))
            .collect::<Result<Vec<_>>>()?;
        out.add_band(name, reduce_stack(&stack, reducer)?)?;
    }

    out.set_property(properties::COMPOSITE_COUNT, collection.len());
    if collection.iter().all(Image::is_masked) {
        out.set_radiometry(Radiometry::Reflectance);
    }

    debug!(
        reducer = reducer.name(),
        images = collection.len(),
        bands = out.band_count(),
        "composite built"
    );
    Ok(out)
}

fn reduce_stack(stack: &[&Raster<f64>], reducer: Reducer) -> Result<Raster<f64>> {
    let template = stack[0];
    for band in &stack[1..] {
        check_dimensions(template, band)?;
    }

    let (rows, cols) = template.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut samples = Vec::with_capacity(stack.len());
            (0..cols)
                .map(|col| {
                    samples.clear();
                    samples.extend(
                        stack
                            .iter()
                            .map(|band| (band, unsafe { band.get_unchecked(row, col) }))
                            .filter(|(band, v)| !band.is_nodata(*v))
                            .map(|(_, v)| v),
                    );
                    reducer.reduce(&mut samples)
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    build_output(template, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn image(id: &str, b4: Vec<f64>) -> Image {
        let n = b4.len();
        Image::from_bands(id, [("B4", Raster::from_vec(b4, 1, n).unwrap())]).unwrap()
    }

    #[test]
    fn test_reducer_values() {
        assert_relative_eq!(Reducer::Median.reduce(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(Reducer::Median.reduce(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_relative_eq!(Reducer::Max.reduce(&mut [0.2, 0.7, 0.1]), 0.7);
        assert_relative_eq!(Reducer::Min.reduce(&mut [0.2, 0.7, 0.1]), 0.1);
        assert_relative_eq!(Reducer::Mean.reduce(&mut [1.0, 2.0, 6.0]), 3.0);
        assert!(Reducer::Median.reduce(&mut []).is_nan());
    }

    #[test]
    fn test_reducer_parse() {
        assert_eq!("Median".parse::<Reducer>().unwrap(), Reducer::Median);
        assert_eq!("maximum".parse::<Reducer>().unwrap(), Reducer::Max);
        assert!("mode".parse::<Reducer>().is_err());
    }

    #[test]
    fn test_median_composite_skips_masked_samples() {
        let collection = ImageCollection::new(vec![
            image("a", vec![0.1, f64::NAN, f64::NAN]),
            image("b", vec![0.3, 0.4, f64::NAN]),
            image("c", vec![0.2, f64::NAN, f64::NAN]),
        ]);

        let out = composite(&collection, Reducer::Median).unwrap();
        let b4 = out.select("B4").unwrap();
        assert_relative_eq!(b4.get(0, 0).unwrap(), 0.2);
        assert_relative_eq!(b4.get(0, 1).unwrap(), 0.4);
        assert!(b4.get(0, 2).unwrap().is_nan());
        assert_eq!(out.property_f64("composite:count").unwrap(), Some(3.0));
    }

    #[test]
    fn test_declared_nodata_is_skipped() {
        let mut missing = image("a", vec![-9999.0]);
        let mut band = missing.select("B4").unwrap().clone();
        band.set_nodata(Some(-9999.0));
        missing.add_band("B4", band).unwrap();

        let collection =
            ImageCollection::new(vec![missing, image("b", vec![0.4]), image("c", vec![0.6])]);
        let min = composite(&collection, Reducer::Min).unwrap();
        assert_relative_eq!(min.select("B4").unwrap().get(0, 0).unwrap(), 0.4);
        let mean = composite(&collection, Reducer::Mean).unwrap();
        assert_relative_eq!(mean.select("B4").unwrap().get(0, 0).unwrap(), 0.5);
    }

    #[test]
    fn test_max_composite() {
        let collection = ImageCollection::new(vec![
            image("a", vec![0.1, 0.9]),
            image("b", vec![0.5, 0.3]),
        ]);
        let out = collection.reduce(Reducer::Max).unwrap();
        let b4 = out.select("B4").unwrap();
        assert_relative_eq!(b4.get(0, 0).unwrap(), 0.5);
        assert_relative_eq!(b4.get(0, 1).unwrap(), 0.9);
        assert!(!out.is_masked());
    }

    #[test]
    fn test_only_common_bands_are_reduced() {
        let a = image("a", vec![0.1]).with_band("NDVI", Raster::filled(1, 1, 0.5)).unwrap();
        let b = image("b", vec![0.3]);

        let out = composite(&ImageCollection::new(vec![a, b]), Reducer::Mean).unwrap();
        assert_eq!(out.band_names().collect::<Vec<_>>(), ["B4"]);
    }

    #[test]
    fn test_empty_and_mismatched() {
        assert!(matches!(
            composite(&ImageCollection::default(), Reducer::Median),
            Err(Error::EmptyCollection)
        ));

        let collection = ImageCollection::new(vec![image("a", vec![0.1, 0.2]), image("b", vec![0.1])]);
        assert!(matches!(
            composite(&collection, Reducer::Median),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
