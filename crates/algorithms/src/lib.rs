//! # mica algorithms
//!
//! Station-field estimation on a regular grid.
//!
//! ## Modules
//!
//! - **interpolation**: planar and altitude-aware inverse distance weighting
//! - **regression**: stepwise, sigma-filtered and clustered multi-linear regression
//! - **regions**: polygon cluster definitions and their blending masks
//! - **distance**: coast proximity predictor
//! - **estimator**: configuration and the method dispatch tying it together

pub mod distance;
pub mod estimator;
pub mod interpolation;
pub mod regions;
pub mod regression;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::distance::{coast_proximity, distances_to_line, proximity_raster};
    pub use crate::estimator::{ConfigFile, Estimator, EstimatorConfig, Method};
    pub use crate::interpolation::{
        inverse_distance, inverse_distance_3d, InverseDistance3dParams, InverseDistanceParams, SamplePoint,
        SamplePoint3,
    };
    pub use crate::regions::{rasterize_regions, AssignedRegions, PolygonRegions};
    pub use crate::regression::{
        ClusteredRegression, MultiRegression, Regression, RegressionParams, SigmaRegression,
    };
    pub use mica_core::prelude::*;
}
