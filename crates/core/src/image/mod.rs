//! Multi-band images
//!
//! An [`Image`] is an ordered set of equally shaped `Raster<f64>` bands
//! addressed by name (`"B4"`, `"QA60"`, `"NDVI"`), plus a free-form property
//! map carried through every processing step unchanged.

pub mod properties;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{BBox, GeoTransform, Raster};

/// Radiometric state of the reflectance bands of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Radiometry {
    /// Digital numbers as delivered by the product (reflectance * 10000)
    #[default]
    Raw,
    /// Cloud masked and scaled to surface reflectance
    Reflectance,
}

/// A multispectral image: named bands sharing one grid, plus properties.
#[derive(Debug, Clone, Default)]
pub struct Image {
    id: String,
    bands: Vec<(String, Raster<f64>)>,
    properties: Map<String, Value>,
    radiometry: Radiometry,
}

impl Image {
    /// Create an image with no bands
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Create an image from `(name, band)` pairs
    pub fn from_bands<I, S>(id: impl Into<String>, bands: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Raster<f64>)>,
        S: Into<String>,
    {
        let mut image = Self::new(id);
        for (name, band) in bands {
            image.add_band(name, band)?;
        }
        Ok(image)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    // Bands

    /// Band names in insertion order
    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, band)` pairs in insertion order
    pub fn bands(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.bands.iter().map(|(name, band)| (name.as_str(), band))
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|(n, _)| n == name)
    }

    /// Look up a band by name.
    ///
    /// # Errors
    /// [`Error::MissingBand`] if the image does not carry `name`.
    pub fn select(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, band)| band)
            .ok_or_else(|| Error::missing_band(name))
    }

    /// Look up several bands at once, failing on the first missing one.
    pub fn select_many<const N: usize>(&self, names: [&str; N]) -> Result<[&Raster<f64>; N]> {
        let mut found = Vec::with_capacity(N);
        for name in names {
            found.push(self.select(name)?);
        }
        found
            .try_into()
            .map_err(|_| Error::Other("band lookup length mismatch".into()))
    }

    /// Append a band, or replace an existing band with the same name.
    ///
    /// # Errors
    /// [`Error::SizeMismatch`] if `band` does not match the image's shape.
    pub fn add_band(&mut self, name: impl Into<String>, band: Raster<f64>) -> Result<()> {
        if let Some((er, ec)) = self.shape() {
            let (ar, ac) = band.shape();
            if (er, ec) != (ar, ac) {
                return Err(Error::SizeMismatch { er, ec, ar, ac });
            }
        }

        let name = name.into();
        match self.bands.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = band,
            None => self.bands.push((name, band)),
        }
        Ok(())
    }

    /// Copy of this image with one extra band.
    pub fn with_band(&self, name: impl Into<String>, band: Raster<f64>) -> Result<Self> {
        let mut out = self.clone();
        out.add_band(name, band)?;
        Ok(out)
    }

    // Geometry

    /// Grid shape `(rows, cols)`, `None` for an image without bands
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.bands.first().map(|(_, band)| band.shape())
    }

    pub fn transform(&self) -> Option<&GeoTransform> {
        self.bands.first().map(|(_, band)| band.transform())
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.bands.first().and_then(|(_, band)| band.crs())
    }

    pub fn bounds(&self) -> Option<BBox> {
        self.bands.first().map(|(_, band)| band.bounds())
    }

    // Properties

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Copy every property of `source` onto this image, overwriting
    /// properties with the same key.
    pub fn copy_properties(&mut self, source: &Image) {
        self.properties
            .extend(source.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Numeric property, `None` if absent
    pub fn property_f64(&self, key: &str) -> Result<Option<f64>> {
        self.get_property(key)
            .map(|v| properties::as_f64(key, v))
            .transpose()
    }

    /// Acquisition time from the `datetime` property, `None` if absent
    pub fn datetime(&self) -> Result<Option<DateTime<Utc>>> {
        self.get_property(properties::DATETIME)
            .map(|v| properties::as_datetime(properties::DATETIME, v))
            .transpose()
    }

    /// Scene cloud percentage, `None` if absent
    pub fn cloud_cover(&self) -> Result<Option<f64>> {
        self.property_f64(properties::CLOUDY_PIXEL_PERCENTAGE)
    }

    // Radiometry

    pub fn radiometry(&self) -> Radiometry {
        self.radiometry
    }

    pub fn set_radiometry(&mut self, radiometry: Radiometry) {
        self.radiometry = radiometry;
    }

    /// Whether the cloud mask (and reflectance scaling) has been applied
    pub fn is_masked(&self) -> bool {
        self.radiometry == Radiometry::Reflectance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn band(value: f64) -> Raster<f64> {
        Raster::filled(2, 3, value)
    }

    #[test]
    fn test_select_reports_missing_band() {
        let image = Image::from_bands("s2", [("B4", band(0.1))]).unwrap();
        assert!(image.select("B4").is_ok());

        match image.select("B11") {
            Err(Error::MissingBand { band }) => assert_eq!(band, "B11"),
            other => panic!("expected MissingBand, got {:?}", other),
        }
    }

    #[test]
    fn test_select_many_fails_on_first_missing() {
        let image = Image::from_bands("s2", [("B4", band(0.1)), ("B8", band(0.3))]).unwrap();
        let [nir, red] = image.select_many(["B8", "B4"]).unwrap();
        assert_eq!(nir.get(0, 0).unwrap(), 0.3);
        assert_eq!(red.get(0, 0).unwrap(), 0.1);

        assert!(matches!(
            image.select_many(["B8", "B2"]),
            Err(Error::MissingBand { .. })
        ));
    }

    #[test]
    fn test_add_band_checks_shape_and_replaces_by_name() {
        let mut image = Image::from_bands("s2", [("B4", band(0.1))]).unwrap();

        let err = image.add_band("B8", Raster::filled(3, 3, 0.0)).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { er: 2, ec: 3, ar: 3, ac: 3 }));

        image.add_band("B4", band(0.2)).unwrap();
        assert_eq!(image.band_count(), 1);
        assert_eq!(image.select("B4").unwrap().get(1, 1).unwrap(), 0.2);
    }

    #[test]
    fn test_with_band_leaves_original_untouched() {
        let image = Image::from_bands("s2", [("B4", band(0.1))]).unwrap();
        let derived = image.with_band("NDVI", band(0.5)).unwrap();

        assert_eq!(image.band_names().collect::<Vec<_>>(), ["B4"]);
        assert_eq!(derived.band_names().collect::<Vec<_>>(), ["B4", "NDVI"]);
    }

    #[test]
    fn test_properties_are_copied_and_typed() {
        let mut source = Image::new("a");
        source.set_property(properties::CLOUDY_PIXEL_PERCENTAGE, 12.5);
        source.set_property(properties::DATETIME, "2023-06-01");

        let mut target = Image::new("b");
        target.set_property("SPACECRAFT_NAME", "Sentinel-2A");
        target.copy_properties(&source);

        assert_eq!(target.cloud_cover().unwrap(), Some(12.5));
        assert!(target.datetime().unwrap().is_some());
        assert_eq!(target.get_property("SPACECRAFT_NAME"), Some(&json!("Sentinel-2A")));
        assert_eq!(Image::new("c").cloud_cover().unwrap(), None);
    }

    #[test]
    fn test_new_images_are_raw() {
        let image = Image::new("s2");
        assert_eq!(image.radiometry(), Radiometry::Raw);
        assert!(!image.is_masked());
        assert!(image.shape().is_none());
    }
}
