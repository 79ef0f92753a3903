//! Planar inverse distance weighting
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use mica_core::{GeoTransform, Raster, Result};

use super::{check_kernel_params, evaluate_grid, weighted_mean, SamplePoint};

/// Parameters for planar inverse distance interpolation
#[derive(Debug, Clone)]
pub struct InverseDistanceParams {
    /// Distance exponent (default: 2.0)
    pub power: f64,
    /// Added in quadrature to every distance (default: 0.0).
    /// A positive value keeps the field from reproducing samples exactly.
    pub smoothing: f64,
    /// Output rows
    pub rows: usize,
    /// Output columns
    pub cols: usize,
    /// Output geotransform
    pub transform: GeoTransform,
}

impl Default for InverseDistanceParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            smoothing: 0.0,
            rows: 100,
            cols: 100,
            transform: GeoTransform::default(),
        }
    }
}

/// Interpolate scattered samples onto the grid described by `params`.
///
/// # Algorithm
///
/// ```text
/// z(x,y) = Σ(wᵢ zᵢ) / Σ(wᵢ)
/// wᵢ = (dᵢ² + s²)^(−p/2)
/// ```
///
/// A node at zero effective distance from a sample takes that sample's
/// value.
pub fn inverse_distance(points: &[SamplePoint], params: InverseDistanceParams) -> Result<Raster<f64>> {
    check_kernel_params(points.len(), params.power, params.smoothing, params.rows, params.cols)?;

    let smoothing_sq = params.smoothing * params.smoothing;
    let power = params.power;

    evaluate_grid(params.rows, params.cols, params.transform, |_, _, x, y| {
        weighted_mean(
            points.iter().map(|p| (p.dist_sq(x, y) + smoothing_sq, p.value)),
            power,
        )
    })
}
