//! Path-addressed access to predictor rasters, cluster definitions and masks
//!
//! File formats are not parsed here. A [`Catalog`] implementation owns that
//! and hands back decoded values; [`MemoryCatalog`] serves values that were
//! registered up front.

use crate::error::{Error, Result};
use crate::raster::Raster;
use crate::region::RegionMembership;
use ndarray::Array3;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of the inputs named in an estimator configuration.
pub trait Catalog {
    /// Single-band raster stored at `path`
    fn raster(&self, path: &str) -> Result<Raster<f64>>;

    /// Cluster definition stored at `path`
    fn regions(&self, path: &str) -> Result<Arc<dyn RegionMembership>>;

    /// Blending mask (region × row × col) stored at `path`
    fn mask(&self, path: &str) -> Result<Array3<f64>>;
}

/// In-memory [`Catalog`]
#[derive(Default, Clone)]
pub struct MemoryCatalog {
    rasters: HashMap<String, Raster<f64>>,
    regions: HashMap<String, Arc<dyn RegionMembership>>,
    masks: HashMap<String, Array3<f64>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raster(mut self, path: impl Into<String>, raster: Raster<f64>) -> Self {
        self.rasters.insert(path.into(), raster);
        self
    }

    pub fn with_regions(
        mut self,
        path: impl Into<String>,
        regions: Arc<dyn RegionMembership>,
    ) -> Self {
        self.regions.insert(path.into(), regions);
        self
    }

    pub fn with_mask(mut self, path: impl Into<String>, mask: Array3<f64>) -> Self {
        self.masks.insert(path.into(), mask);
        self
    }
}

fn lookup<T: Clone>(map: &HashMap<String, T>, path: &str) -> Result<T> {
    map.get(path)
        .cloned()
        .ok_or_else(|| Error::FileNotFound(path.to_string()))
}

impl Catalog for MemoryCatalog {
    fn raster(&self, path: &str) -> Result<Raster<f64>> {
        lookup(&self.rasters, path)
    }

    fn regions(&self, path: &str) -> Result<Arc<dyn RegionMembership>> {
        lookup(&self.regions, path)
    }

    fn mask(&self, path: &str) -> Result<Array3<f64>> {
        lookup(&self.masks, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path() {
        let catalog = MemoryCatalog::new().with_raster("alt.tif", Raster::new(2, 2));
        assert_eq!(catalog.raster("alt.tif").unwrap().shape(), (2, 2));
        let err = catalog.raster("dist.tif").unwrap_err();
        assert_eq!(err.to_string(), "No such file or directory: dist.tif");
        assert!(matches!(catalog.mask("mask.tif"), Err(Error::FileNotFound(_))));
        assert!(matches!(catalog.regions("c.json"), Err(Error::FileNotFound(_))));
    }
}
