//! Scene manifests: one JSON file describing a multi-band image on disk.
//!
//! ```json
//! {
//!   "id": "S2A_MSIL2A_20230601T103031_T31UFT",
//!   "crs": "EPSG:32631",
//!   "bands": { "B4": "B04.tif", "B8": "B08.tif", "QA60": "QA60.tif" },
//!   "properties": { "datetime": "2023-06-01T10:30:31Z", "CLOUDY_PIXEL_PERCENTAGE": 4.2 }
//! }
//! ```
//!
//! Relative band paths are resolved against the manifest's directory.
//! An optional `"radiometry": "reflectance"` marks bands that are already
//! cloud masked and scaled, so loading them back does not scale them again.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::image::{Image, Radiometry};
use crate::io::native::{read_geotiff, write_geotiff};

/// Parsed scene manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneManifest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Band name to GeoTIFF path
    pub bands: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Absent means raw digital numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radiometry: Option<Radiometry>,
}

impl SceneManifest {
    /// Read a manifest from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let manifest = serde_json::from_reader(BufReader::new(file))?;
        Ok(manifest)
    }

    /// Load every band into an [`Image`]. Band paths are resolved against `base_dir`.
    pub fn load(&self, base_dir: &Path) -> Result<Image> {
        if self.bands.is_empty() {
            return Err(Error::InvalidParameter {
                name: "bands",
                value: self.id.clone(),
                reason: "scene manifest lists no bands".into(),
            });
        }

        let crs = self.crs.as_deref().map(str::parse::<CRS>).transpose()?;

        let mut image = Image::new(&self.id);
        for (name, rel) in &self.bands {
            let path = base_dir.join(rel);
            debug!(scene = %self.id, band = %name, path = %path.display(), "reading band");

            let mut band = read_geotiff::<f64, _>(&path)?;
            if crs.is_some() {
                band.set_crs(crs.clone());
            }
            image.add_band(name.as_str(), band)?;
        }

        for (key, value) in &self.properties {
            image.set_property(key.as_str(), value.clone());
        }
        image.set_radiometry(self.radiometry.unwrap_or_default());
        Ok(image)
    }

    /// Write the manifest as pretty-printed JSON
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Read a scene manifest and all of its bands
pub fn read_scene<P: AsRef<Path>>(path: P) -> Result<Image> {
    let path = path.as_ref();
    let manifest = SceneManifest::from_path(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.load(base_dir)
}

/// Write every band of `image` to `<dir>/<id>_<band>.tif` plus a `<dir>/<id>.json`
/// manifest that [`read_scene`] loads back into an equivalent image.
///
/// Returns the manifest path.
pub fn write_scene<P: AsRef<Path>>(image: &Image, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut bands = BTreeMap::new();
    for (name, band) in image.bands() {
        let file = PathBuf::from(format!("{}_{}.tif", image.id(), name));
        write_geotiff(band, dir.join(&file))?;
        bands.insert(name.to_string(), file);
    }

    let manifest = SceneManifest {
        id: image.id().to_string(),
        crs: image.crs().and_then(crs_string),
        bands,
        properties: image.properties().clone(),
        radiometry: Some(image.radiometry()),
    };
    let path = dir.join(format!("{}.json", image.id()));
    manifest.to_path(&path)?;
    debug!(scene = %image.id(), path = %path.display(), "scene written");
    Ok(path)
}

// Full text, unlike `Display` which shortens WKT
fn crs_string(crs: &CRS) -> Option<String> {
    match crs.epsg() {
        Some(code) => Some(format!("EPSG:{}", code)),
        None => crs.wkt().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::native::write_geotiff;
    use crate::raster::Raster;
    use serde_json::json;

    #[test]
    fn test_manifest_loads_bands_and_properties() {
        let dir = tempfile::tempdir().unwrap();
        write_geotiff(&Raster::filled(3, 3, 1000.0f64), dir.path().join("b4.tif")).unwrap();
        write_geotiff(&Raster::filled(3, 3, 3000.0f64), dir.path().join("b8.tif")).unwrap();

        let manifest = json!({
            "id": "T31UFT_20230601",
            "crs": "EPSG:32631",
            "bands": { "B4": "b4.tif", "B8": "b8.tif" },
            "properties": { "datetime": "2023-06-01", "CLOUDY_PIXEL_PERCENTAGE": 4.2 }
        });
        let manifest_path = dir.path().join("scene.json");
        std::fs::write(&manifest_path, manifest.to_string()).unwrap();

        let image = read_scene(&manifest_path).unwrap();
        assert_eq!(image.id(), "T31UFT_20230601");
        assert_eq!(image.band_names().collect::<Vec<_>>(), ["B4", "B8"]);
        assert_eq!(image.select("B8").unwrap().get(1, 1).unwrap(), 3000.0);
        assert_eq!(image.crs().and_then(|c| c.epsg()), Some(32631));
        assert_eq!(image.cloud_cover().unwrap(), Some(4.2));
        assert_eq!(image.radiometry(), Radiometry::Raw);
    }

    #[test]
    fn test_written_scene_keeps_radiometry() {
        let dir = tempfile::tempdir().unwrap();
        let mut b4 = Raster::filled(2, 2, 0.09f64);
        b4.set_crs(Some(CRS::from_epsg(32631)));
        let mut image = Image::from_bands("masked", [("B4", b4)]).unwrap();
        image.set_property("CLOUDY_PIXEL_PERCENTAGE", 3.0);
        image.set_radiometry(Radiometry::Reflectance);

        let path = write_scene(&image, dir.path().join("out")).unwrap();
        let loaded = read_scene(&path).unwrap();

        assert!(loaded.is_masked());
        assert_eq!(loaded.band_names().collect::<Vec<_>>(), ["B4"]);
        assert!((loaded.select("B4").unwrap().get(0, 0).unwrap() - 0.09).abs() < 1e-6);
        assert_eq!(loaded.crs().and_then(|c| c.epsg()), Some(32631));
        assert_eq!(loaded.cloud_cover().unwrap(), Some(3.0));
    }

    #[test]
    fn test_radiometry_field_parses() {
        let manifest: SceneManifest = serde_json::from_value(
            json!({ "id": "s", "bands": { "B4": "b4.tif" }, "radiometry": "reflectance" }),
        )
        .unwrap();
        assert_eq!(manifest.radiometry, Some(Radiometry::Reflectance));
    }

    #[test]
    fn test_missing_band_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = SceneManifest {
            id: "broken".into(),
            crs: None,
            bands: BTreeMap::from([("B4".to_string(), PathBuf::from("nope.tif"))]),
            properties: Map::new(),
            radiometry: None,
        };
        assert!(matches!(manifest.load(dir.path()), Err(Error::Io(_))));
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        let manifest: SceneManifest =
            serde_json::from_value(json!({ "id": "empty", "bands": {} })).unwrap();
        assert!(manifest.load(Path::new(".")).is_err());
    }
}
