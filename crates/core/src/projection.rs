//! Geographic to projected coordinate conversion

use crate::error::Result;
use crate::observation::Observation;

/// Converts station lon/lat into the output grid's projected x/y.
pub trait PointTransform: Send + Sync {
    fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64)>;

    /// Copies of `points` with `x`/`y` replaced by projected coordinates
    fn project_points(&self, points: &[Observation]) -> Result<Vec<Observation>> {
        points
            .iter()
            .map(|p| {
                let (x, y) = self.project(p.lon, p.lat)?;
                let mut projected = p.clone();
                projected.set_position(x, y);
                Ok(projected)
            })
            .collect()
    }
}

/// Leaves coordinates untouched, for inputs already in grid units
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl PointTransform for IdentityTransform {
    fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        Ok((lon, lat))
    }
}
