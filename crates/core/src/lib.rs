//! # mica core
//!
//! Core types shared by the mica station-field estimation crates.
//!
//! This crate provides:
//! - `Raster<T>` and `RasterStack`: georeferenced grids and aligned predictor layers
//! - `GeoTransform` and `CRS`: georeferencing
//! - `Observation`: a station reading with its auxiliary fields
//! - Collaborator traits (`Catalog`, `RegionMembership`, `PointTransform`)
//!   through which inputs that live outside the library are reached

pub mod catalog;
pub mod crs;
pub mod error;
pub mod observation;
pub mod projection;
pub mod raster;
pub mod region;

pub use catalog::{Catalog, MemoryCatalog};
pub use crs::CRS;
pub use error::{Error, Result};
pub use observation::{check_unique_ids, Observation, ALTITUDE};
pub use projection::{IdentityTransform, PointTransform};
pub use raster::{GeoTransform, Raster, RasterElement, RasterStack};
pub use region::RegionMembership;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::{Catalog, MemoryCatalog};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::observation::Observation;
    pub use crate::projection::{IdentityTransform, PointTransform};
    pub use crate::raster::{GeoTransform, Raster, RasterStack};
    pub use crate::region::RegionMembership;
}
