//! Cluster membership seen from the estimation side

use crate::observation::Observation;
use std::sync::Arc;

/// A set of possibly overlapping regions that stations can fall into.
pub trait RegionMembership: Send + Sync {
    fn region_count(&self) -> usize;

    /// Whether `point` belongs to `region`
    fn contains(&self, region: usize, point: &Observation) -> bool;

    /// Indices into `points` of the members of each region.
    ///
    /// A point inside several regions is listed in each of them.
    fn partition(&self, points: &[Observation]) -> Vec<Vec<usize>> {
        (0..self.region_count())
            .map(|region| {
                points
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| self.contains(region, p))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect()
    }
}

impl<T: RegionMembership + ?Sized> RegionMembership for Arc<T> {
    fn region_count(&self) -> usize {
        (**self).region_count()
    }

    fn contains(&self, region: usize, point: &Observation) -> bool {
        (**self).contains(region, point)
    }
}

impl<T: RegionMembership + ?Sized> RegionMembership for &T {
    fn region_count(&self) -> usize {
        (**self).region_count()
    }

    fn contains(&self, region: usize, point: &Observation) -> bool {
        (**self).contains(region, point)
    }
}
