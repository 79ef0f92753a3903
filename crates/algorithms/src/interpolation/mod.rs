//! Inverse-distance interpolation of scattered station values
//!
//! - [`inverse_distance`]: planar distance with optional smoothing
//! - [`inverse_distance_3d`]: planar distance plus a penalized altitude gap,
//!   so stations at a different height than the node weigh less
//!
//! Both evaluate the kernel at grid nodes (`origin + index * size`) and
//! return a raster on the requested grid.

mod inverse_distance;
mod inverse_distance_3d;

pub use inverse_distance::{inverse_distance, InverseDistanceParams};
pub use inverse_distance_3d::{inverse_distance_3d, InverseDistance3dParams};

use crate::maybe_rayon::*;
use mica_core::{Error, GeoTransform, Raster, Result};

/// A sample with planar coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared planar distance to (x, y)
    #[inline]
    pub fn dist_sq(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// A sample that also knows its altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub value: f64,
}

impl SamplePoint3 {
    pub fn new(x: f64, y: f64, z: f64, value: f64) -> Self {
        Self { x, y, z, value }
    }

    #[inline]
    pub fn dist_sq(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// Σ wᵢvᵢ / Σ wᵢ with wᵢ = eᵢ^(−power/2), where eᵢ is the effective squared
/// distance of sample i. A sample at zero effective distance is returned as is.
#[inline]
fn weighted_mean(samples: impl Iterator<Item = (f64, f64)>, power: f64) -> f64 {
    let exponent = -power / 2.0;
    let mut sum_w = 0.0;
    let mut sum_wv = 0.0;
    for (eff_sq, value) in samples {
        if eff_sq == 0.0 {
            return value;
        }
        let w = eff_sq.powf(exponent);
        sum_w += w;
        sum_wv += w * value;
    }
    sum_wv / sum_w
}

fn check_kernel_params(n_points: usize, power: f64, smoothing: f64, rows: usize, cols: usize) -> Result<()> {
    if n_points == 0 {
        return Err(Error::Algorithm("No sample points provided".into()));
    }
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    if !power.is_finite() || power < 0.0 {
        return Err(Error::InvalidParameter {
            name: "power",
            value: power.to_string(),
            reason: "must be a finite non-negative number".into(),
        });
    }
    if !smoothing.is_finite() {
        return Err(Error::InvalidParameter {
            name: "smoothing",
            value: smoothing.to_string(),
            reason: "must be finite".into(),
        });
    }
    Ok(())
}

/// Evaluate `node_value(row, col, x, y)` at every grid node, one row per task.
fn evaluate_grid<F>(rows: usize, cols: usize, transform: GeoTransform, node_value: F) -> Result<Raster<f64>>
where
    F: Fn(usize, usize, f64, f64) -> f64 + Sync + Send,
{
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let (x, y) = transform.node(col, row);
                    node_value(row, col, x, y)
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(transform);
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}
