//! Cluster definitions stations can be partitioned by
//!
//! - [`PolygonRegions`]: one multipolygon per region, tested on projected x/y
//! - [`AssignedRegions`]: explicit station id → region lists
//! - [`rasterize_regions`]: per-region blending masks on an output grid

mod rasterize;

pub use rasterize::rasterize_regions;

use geo::{Contains, MultiPolygon, Point};
use mica_core::{Observation, RegionMembership};
use std::collections::HashMap;

/// Regions bounded by polygons in the projected coordinate system.
///
/// Containment is strict: a station on a region border is outside it.
#[derive(Debug, Clone, Default)]
pub struct PolygonRegions {
    regions: Vec<MultiPolygon<f64>>,
}

impl PolygonRegions {
    pub fn new(regions: Vec<MultiPolygon<f64>>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &[MultiPolygon<f64>] {
        &self.regions
    }

    /// Whether the projected position (x, y) is inside `region`
    pub fn contains_xy(&self, region: usize, x: f64, y: f64) -> bool {
        self.regions
            .get(region)
            .is_some_and(|shape| shape.contains(&Point::new(x, y)))
    }
}

impl RegionMembership for PolygonRegions {
    fn region_count(&self) -> usize {
        self.regions.len()
    }

    fn contains(&self, region: usize, point: &Observation) -> bool {
        self.contains_xy(region, point.x, point.y)
    }
}

/// Regions given as lists of station ids.
#[derive(Debug, Clone, Default)]
pub struct AssignedRegions {
    count: usize,
    members: HashMap<String, Vec<usize>>,
}

impl AssignedRegions {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            members: HashMap::new(),
        }
    }

    /// Add station `id` to `region`. Indices past the current count grow it.
    pub fn assign(&mut self, id: impl Into<String>, region: usize) {
        self.count = self.count.max(region + 1);
        let regions = self.members.entry(id.into()).or_default();
        if !regions.contains(&region) {
            regions.push(region);
        }
    }

    pub fn regions_of(&self, id: &str) -> &[usize] {
        self.members.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

impl RegionMembership for AssignedRegions {
    fn region_count(&self) -> usize {
        self.count
    }

    fn contains(&self, region: usize, point: &Observation) -> bool {
        self.regions_of(&point.id).contains(&region)
    }
}
