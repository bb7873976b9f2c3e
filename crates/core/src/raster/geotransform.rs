//! Affine georeferencing and bounding boxes

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Affine transformation coefficients for georeferencing rasters.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Sentinel-2 tiles are north-up, so the rotations are 0 and `pixel_height`
/// is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    #[serde(default)]
    pub row_rotation: f64,
    #[serde(default)]
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Geographic coordinates of the center of pixel (col, row)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.corner(col as f64 + 0.5, row as f64 + 0.5)
    }

    fn corner(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Cell size (assumes square pixels and no rotation)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Bounding box of a raster with `cols` x `rows` cells
    pub fn bounds(&self, cols: usize, rows: usize) -> BBox {
        let corners = [
            self.corner(0.0, 0.0),
            self.corner(cols as f64, 0.0),
            self.corner(0.0, rows as f64),
            self.corner(cols as f64, rows as f64),
        ];

        corners.iter().skip(1).fold(
            BBox::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1),
            |acc, &(x, y)| BBox {
                west: acc.west.min(x),
                south: acc.south.min(y),
                east: acc.east.max(x),
                north: acc.north.max(y),
            },
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Axis-aligned bounding box `[west, south, east, north]` in CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// True when the two boxes share any area or edge.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }

}

impl FromStr for BBox {
    type Err = Error;

    /// Parses `west,south,east,north`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::InvalidParameter {
            name: "bbox",
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid("coordinates must be numbers"))?;

        match parts[..] {
            [w, s_, e, n] if w <= e && s_ <= n => Ok(BBox::new(w, s_, e, n)),
            [_, _, _, _] => Err(invalid("west must be <= east and south <= north")),
            _ => Err(invalid("expected west,south,east,north")),
        }
    }
}
