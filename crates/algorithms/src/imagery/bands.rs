//! Sentinel-2 band names used by the pipeline

/// Blue, 490 nm
pub const BLUE: &str = "B2";
/// Green, 560 nm
pub const GREEN: &str = "B3";
/// Red, 665 nm
pub const RED: &str = "B4";
/// Near infrared, 842 nm
pub const NIR: &str = "B8";
/// Short-wave infrared, 1610 nm
pub const SWIR1: &str = "B11";
/// 60 m quality bitmask (bit 10 opaque clouds, bit 11 cirrus)
pub const QA60: &str = "QA60";

pub const NDVI: &str = "NDVI";
pub const NDMI: &str = "NDMI";
pub const MSAVI: &str = "MSAVI";
pub const BSI: &str = "BSI";
