//! Inverse distance weighting with an altitude penalty

use mica_core::{Error, GeoTransform, Raster, Result};
use ndarray::ArrayView2;

use super::{check_kernel_params, evaluate_grid, weighted_mean, SamplePoint3};

/// Parameters for altitude-aware inverse distance interpolation
#[derive(Debug, Clone)]
pub struct InverseDistance3dParams {
    /// Distance exponent (default: 2.0)
    pub power: f64,
    /// Added in quadrature to every distance (default: 0.0)
    pub smoothing: f64,
    /// Scale applied to the altitude difference before it joins the
    /// planar distance (default: 30.0)
    pub penalization: f64,
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
}

impl Default for InverseDistance3dParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            smoothing: 0.0,
            penalization: 30.0,
            rows: 100,
            cols: 100,
            transform: GeoTransform::default(),
        }
    }
}

/// Interpolate samples onto the grid, weighting by planar distance and
/// altitude gap.
///
/// ```text
/// wᵢ = (dᵢ² + (k·(z_node − zᵢ))² + s²)^(−p/2)
/// ```
///
/// `altitude` gives the node altitude and must have the grid's shape.
pub fn inverse_distance_3d(
    points: &[SamplePoint3],
    altitude: ArrayView2<'_, f64>,
    params: InverseDistance3dParams,
) -> Result<Raster<f64>> {
    check_kernel_params(points.len(), params.power, params.smoothing, params.rows, params.cols)?;
    if altitude.dim() != (params.rows, params.cols) {
        return Err(Error::SizeMismatch {
            what: "altitude grid",
            expected: vec![params.rows, params.cols],
            actual: altitude.shape().to_vec(),
        });
    }
    if !params.penalization.is_finite() || params.penalization < 0.0 {
        return Err(Error::InvalidParameter {
            name: "penalization",
            value: params.penalization.to_string(),
            reason: "must be a finite non-negative number".into(),
        });
    }

    let smoothing_sq = params.smoothing * params.smoothing;
    let penalization = params.penalization;
    let power = params.power;

    evaluate_grid(params.rows, params.cols, params.transform, |row, col, x, y| {
        let z = altitude[(row, col)];
        weighted_mean(
            points.iter().map(|p| {
                let dz = penalization * (z - p.z);
                (p.dist_sq(x, y) + dz * dz + smoothing_sq, p.value)
            }),
            power,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, s, Array2};
    use std::time::{Duration, Instant};

    fn samples() -> Vec<SamplePoint3> {
        vec![
            SamplePoint3::new(0.0, 0.0, 1.0, 0.0),
            SamplePoint3::new(1.0, 1.0, 0.0, 1.0),
            SamplePoint3::new(2.0, 2.0, 0.0, 2.0),
        ]
    }

    fn dem() -> Array2<f64> {
        array![
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 0.0, 2.0],
            [1.0, 0.0, 0.0, 0.0, 3.0],
        ]
    }

    fn params() -> InverseDistance3dParams {
        InverseDistance3dParams {
            rows: 5,
            cols: 5,
            transform: GeoTransform::from_gdal([0.0, 0.5, 0.0, 2.0, 0.0, -0.5]),
            ..Default::default()
        }
    }

    fn check(field: &Raster<f64>, expected: [((usize, usize), f64); 3]) {
        for ((row, col), value) in expected {
            assert_relative_eq!(field.get(row, col).unwrap(), value, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_defaults() {
        let dem = dem();
        let field = inverse_distance_3d(&samples(), dem.view(), params()).unwrap();
        check(&field, [((0, 0), 0.01317), ((4, 4), 0.70613), ((4, 1), 1.16532)]);
        assert_eq!(field.get(0, 4).unwrap(), 2.0);
        assert_eq!(field.get(4, 0).unwrap(), 0.0);
        assert_eq!(field.get(2, 2).unwrap(), 1.0);
    }

    #[test]
    fn test_power() {
        let dem = dem();
        let field = inverse_distance_3d(&samples(), dem.view(), InverseDistance3dParams { power: 3.0, ..params() }).unwrap();
        check(&field, [((0, 0), 0.00088), ((4, 4), 0.55849), ((4, 1), 1.08205)]);
        assert_eq!(field.get(2, 2).unwrap(), 1.0);
    }

    #[test]
    fn test_smoothing() {
        let dem = dem();
        let field = inverse_distance_3d(&samples(), dem.view(), InverseDistance3dParams { smoothing: 2.0, ..params() }).unwrap();
        check(&field, [((0, 0), 0.02599), ((4, 4), 0.70636), ((4, 1), 1.33359)]);
    }

    #[test]
    fn test_penalization() {
        let dem = dem();
        let field = inverse_distance_3d(
            &samples(),
            dem.view(),
            InverseDistance3dParams {
                smoothing: 2.0,
                penalization: 100.0,
                ..params()
            },
        )
        .unwrap();
        check(&field, [((0, 0), 0.00239), ((4, 4), 0.70593), ((4, 1), 1.33825)]);
    }

    #[test]
    fn test_million_cell_grid() {
        // lowland plateau with a raised west strip and a raised south strip
        let mut dem = Array2::<f64>::zeros((1000, 1000));
        dem.slice_mut(s![750.., ..]).fill(1.0);
        dem.slice_mut(s![.., ..250]).fill(1.0);

        let start = Instant::now();
        let field = inverse_distance_3d(
            &samples(),
            dem.view(),
            InverseDistance3dParams {
                rows: 1000,
                cols: 1000,
                transform: GeoTransform::from_gdal([0.0, 0.002002, 0.0, 2.0, 0.0, -0.002002]),
                ..Default::default()
            },
        )
        .unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed < Duration::from_secs(2), "1000 x 1000 took {elapsed:?}");

        assert_relative_eq!(field.get(0, 999).unwrap(), 2.0, epsilon = 1e-5);
        assert_relative_eq!(field.get(999, 0).unwrap(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(field.get(500, 500).unwrap(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(field.get(0, 0).unwrap(), 0.013, epsilon = 1e-3);
        assert_relative_eq!(field.get(999, 999).unwrap(), 0.013, epsilon = 1e-3);
    }

    #[test]
    fn test_zero_penalization_matches_planar() {
        use crate::interpolation::{inverse_distance, InverseDistanceParams, SamplePoint};

        let dem = dem();
        let flat = inverse_distance_3d(&samples(), dem.view(), InverseDistance3dParams { penalization: 0.0, ..params() }).unwrap();
        let planar: Vec<SamplePoint> = samples().iter().map(|p| SamplePoint::new(p.x, p.y, p.value)).collect();
        let reference = inverse_distance(
            &planar,
            InverseDistanceParams {
                rows: 5,
                cols: 5,
                transform: params().transform,
                ..Default::default()
            },
        )
        .unwrap();
        for (a, b) in flat.data().iter().zip(reference.data().iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_altitude_shape_must_match_grid() {
        let small = Array2::<f64>::zeros((4, 5));
        let err = inverse_distance_3d(&samples(), small.view(), params()).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }
}
