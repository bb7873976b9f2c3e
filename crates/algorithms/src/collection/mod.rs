//! Image collections: filtering and per-image mapping
//!
//! Mirrors the usual catalogue workflow: narrow a set of scenes down by
//! acquisition date, footprint and scene cloudiness, map a preprocessing
//! step over what is left, then reduce it into a composite.

mod composite;

pub use composite::{composite, Reducer};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::maybe_rayon::*;
use vegscope_core::{BBox, Image, Result};

/// An ordered collection of images.
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    images: Vec<Image>,
}

impl ImageCollection {
    pub fn new(images: Vec<Image>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Image> {
        self.images.iter()
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn push(&mut self, image: Image) {
        self.images.push(image);
    }

    /// Keep images for which `keep` returns true.
    pub fn filter<F>(self, keep: F) -> Self
    where
        F: Fn(&Image) -> bool,
    {
        Self {
            images: self.images.into_iter().filter(|image| keep(image)).collect(),
        }
    }

    /// Keep images acquired in `[start, end)`.
    ///
    /// Images without a parseable `datetime` property are dropped.
    pub fn filter_date(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.filter(|image| match image.datetime() {
            Ok(Some(acquired)) => acquired >= start && acquired < end,
            Ok(None) => {
                debug!(image = image.id(), "no datetime, dropped by date filter");
                false
            }
            Err(e) => {
                debug!(image = image.id(), error = %e, "bad datetime, dropped by date filter");
                false
            }
        })
    }

    /// Keep images whose footprint intersects `bbox` (in the images' CRS units).
    pub fn filter_bounds(self, bbox: &BBox) -> Self {
        self.filter(|image| image.bounds().is_some_and(|b| b.intersects(bbox)))
    }

    /// Keep images whose scene cloud percentage is strictly below `max_percent`.
    ///
    /// Images without a `CLOUDY_PIXEL_PERCENTAGE` property are dropped.
    pub fn filter_cloud_cover(self, max_percent: f64) -> Self {
        self.filter(|image| match image.cloud_cover() {
            Ok(Some(pct)) => pct < max_percent,
            _ => {
                debug!(image = image.id(), "no usable cloud cover, dropped");
                false
            }
        })
    }

    /// Apply a fallible step to every image, in parallel. Fails on the first error.
    pub fn map<F>(&self, step: F) -> Result<Self>
    where
        F: Fn(&Image) -> Result<Image> + Sync + Send,
    {
        let images = self
            .images
            .par_iter()
            .map(|image| step(image))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { images })
    }

    /// Reduce the collection into a single composite image.
    pub fn reduce(&self, reducer: Reducer) -> Result<Image> {
        composite(self, reducer)
    }
}

impl FromIterator<Image> for ImageCollection {
    fn from_iter<I: IntoIterator<Item = Image>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for ImageCollection {
    type Item = Image;
    type IntoIter = std::vec::IntoIter<Image>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}

impl<'a> IntoIterator for &'a ImageCollection {
    type Item = &'a Image;
    type IntoIter = std::slice::Iter<'a, Image>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}
