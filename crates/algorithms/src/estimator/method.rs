//! Estimation methods

use mica_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the station values become a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Planar inverse distance on the raw values
    #[serde(rename = "id2d")]
    Id2d,
    /// Altitude-aware inverse distance on the raw values
    #[serde(rename = "id3d")]
    Id3d,
    /// Regression on the predictor rasters only
    #[serde(rename = "mlr")]
    Mlr,
    /// Regression corrected by planar interpolation of its residuals
    #[serde(rename = "mlr+id2d")]
    MlrId2d,
    /// Regression corrected by altitude-aware interpolation of its residuals
    #[serde(rename = "mlr+id3d")]
    MlrId3d,
}

/// Interpolation kernel a method runs, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Planar,
    Altitude,
}

impl Method {
    pub const ALL: [Method; 5] = [Method::Id2d, Method::Id3d, Method::Mlr, Method::MlrId2d, Method::MlrId3d];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Id2d => "id2d",
            Method::Id3d => "id3d",
            Method::Mlr => "mlr",
            Method::MlrId2d => "mlr+id2d",
            Method::MlrId3d => "mlr+id3d",
        }
    }

    pub fn uses_regression(self) -> bool {
        matches!(self, Method::Mlr | Method::MlrId2d | Method::MlrId3d)
    }

    pub fn kernel(self) -> Option<Kernel> {
        match self {
            Method::Id2d | Method::MlrId2d => Some(Kernel::Planar),
            Method::Id3d | Method::MlrId3d => Some(Kernel::Altitude),
            Method::Mlr => None,
        }
    }

    pub fn needs_altitude(self) -> bool {
        self.kernel() == Some(Kernel::Altitude)
    }

    /// Whether predictor rasters must be configured
    pub fn needs_predictors(self) -> bool {
        self.uses_regression() || self.needs_altitude()
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::UnknownMethod(s.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
