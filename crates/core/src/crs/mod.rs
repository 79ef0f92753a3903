//! Coordinate Reference System identification
//!
//! Only identity is tracked here: projection math is the job of a
//! [`PointTransform`](crate::PointTransform) implementation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System of a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    wkt: Option<String>,
    epsg: Option<u32>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether both describe the same system.
    ///
    /// EPSG codes win when both sides carry one; otherwise WKT strings are
    /// compared verbatim.
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => matches!((&self.wkt, &other.wkt), (Some(a), Some(b)) if a == b),
        }
    }

    pub fn identifier(&self) -> String {
        match (&self.epsg, &self.wkt) {
            (Some(code), _) => format!("EPSG:{code}"),
            (None, Some(wkt)) => format!("WKT:{}", wkt.chars().take(50).collect::<String>()),
            (None, None) => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}
