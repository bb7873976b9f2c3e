//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Coordinate reference system attached to a raster or image.
///
/// Only identification is supported; no reprojection happens anywhere in
/// VegScope, so two images are compatible exactly when their CRS compare equivalent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// UTM zone on the northern hemisphere (EPSG:326xx), as used by Sentinel-2 tiles
    pub fn utm_north(zone: u8) -> Self {
        Self::from_epsg(32600 + zone as u32)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => matches!((&self.wkt, &other.wkt), (Some(a), Some(b)) if a == b),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => write!(f, "EPSG:{}", code),
            (None, Some(wkt)) => write!(f, "WKT:{}", wkt.chars().take(50).collect::<String>()),
            (None, None) => write!(f, "Unknown"),
        }
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Accepts `EPSG:<code>` (any case), a bare code, or a WKT string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);

        if let Ok(epsg) = code.parse::<u32>() {
            return Ok(Self::from_epsg(epsg));
        }
        if trimmed.contains('[') {
            return Ok(Self::from_wkt(trimmed));
        }
        Err(Error::InvalidParameter {
            name: "crs",
            value: s.to_string(),
            reason: "expected EPSG:<code> or WKT".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_parse_epsg() {
        let crs: CRS = "EPSG:32631".parse().unwrap();
        assert_eq!(crs.epsg(), Some(32631));
        assert_eq!(crs.to_string(), "EPSG:32631");
        assert!(crs.is_equivalent(&CRS::utm_north(31)));
    }

    #[test]
    fn test_crs_display_truncates_non_ascii_wkt() {
        let wkt = format!("PROJCS[{}\u{e9}\"]", "a".repeat(42));
        let shown = CRS::from_wkt(wkt).to_string();
        assert_eq!(shown.chars().count(), "WKT:".len() + 50);
        assert!(shown.ends_with('\u{e9}'));
    }

    #[test]
    fn test_crs_parse_rejects_garbage() {
        assert!("not a crs".parse::<CRS>().is_err());
    }

    #[test]
    fn test_crs_wkt_equivalence() {
        let a = CRS::from_wkt("GEOGCS[\"WGS 84\"]");
        let b = CRS::from_wkt("GEOGCS[\"WGS 84\"]");
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::wgs84()));
    }
}
