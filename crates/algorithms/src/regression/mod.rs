//! Multi-linear regression of station values against auxiliary fields
//!
//! - [`MultiRegression`]: greedy stepwise selection of predictors
//! - [`SigmaRegression`]: the same, refitted after dropping outliers
//! - [`ClusteredRegression`]: picks, among candidate cluster definitions,
//!   the one whose per-region models explain the stations best
//!
//! Residuals are always `predicted − observed`, keyed by station id.

mod clustered;
mod multiregression;
mod ols;
mod sigma;

pub use clustered::ClusteredRegression;
pub use multiregression::MultiRegression;
pub use sigma::SigmaRegression;

use mica_core::{Error, Observation, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayViewD, Axis, Ix3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ols::{ols, r2_score, LinearFit};

/// Key under which [`Regression::vars_coefs`] reports the intercept
pub const INTERCEPT: &str = "intercept";

/// Tuning shared by the sigma-filtered and clustered regressions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionParams {
    /// Outlier cut-off in residual standard deviations (default: 1.5)
    pub sigma_limit: f64,
    /// Minimum R² gain for a predictor to be kept (default: 0.05)
    pub score_threshold: f64,
}

impl Default for RegressionParams {
    fn default() -> Self {
        Self {
            sigma_limit: 1.5,
            score_threshold: 0.05,
        }
    }
}

/// A linear model fitted on a set of stations.
///
/// `used_vars` and `coefs` always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub used_vars: Vec<String>,
    pub coefs: Vec<f64>,
    pub intercept: f64,
    /// In-sample R²
    pub score: f64,
    /// In-sample `predicted − observed` per station id
    pub residuals: BTreeMap<String, f64>,
}

impl FittedModel {
    /// Ordinary least squares with intercept on exactly `vars`.
    pub fn fit(points: &[Observation], vars: &[String]) -> Result<Self> {
        let design = design_matrix(points, vars)?;
        let target = DVector::from_iterator(points.len(), points.iter().map(|p| p.value));
        let fit: LinearFit = ols(&design, &target)?;

        let predicted: Vec<f64> = design.row_iter().map(|row| fit.predict(row.iter().copied())).collect();
        let observed: Vec<f64> = points.iter().map(|p| p.value).collect();
        let score = r2_score(&observed, &predicted);
        let residuals = points
            .iter()
            .zip(&predicted)
            .map(|(p, pred)| (p.id.clone(), pred - p.value))
            .collect();

        Ok(Self {
            used_vars: vars.to_vec(),
            coefs: fit.coefs,
            intercept: fit.intercept,
            score,
            residuals,
        })
    }

    /// Prediction for one station from its fields
    pub fn predict(&self, point: &Observation) -> Result<f64> {
        let mut value = self.intercept;
        for (var, coef) in self.used_vars.iter().zip(&self.coefs) {
            value += coef * point.field(var)?;
        }
        Ok(value)
    }

    pub fn mae(&self) -> f64 {
        mean(self.residuals.values().map(|r| r.abs()))
    }

    pub fn mse(&self) -> f64 {
        mean(self.residuals.values().map(|r| r * r))
    }
}

fn design_matrix(points: &[Observation], vars: &[String]) -> Result<DMatrix<f64>> {
    let mut values = Vec::with_capacity(points.len() * vars.len());
    for p in points {
        for var in vars {
            values.push(p.field(var)?);
        }
    }
    Ok(DMatrix::from_row_slice(points.len(), vars.len(), &values))
}

/// Arithmetic mean, NaN for an empty input
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    sum / n as f64
}

/// Shared surface of the fitted regressions.
pub trait Regression {
    /// The model used for predictions
    fn model(&self) -> &FittedModel;

    /// `predicted − observed` per station id of the reference set
    fn residuals(&self) -> BTreeMap<String, f64>;

    /// Coefficients in `used_vars` order, and the intercept
    fn coefs(&self) -> (&[f64], f64) {
        let m = self.model();
        (&m.coefs, m.intercept)
    }

    fn used_vars(&self) -> &[String] {
        &self.model().used_vars
    }

    /// Coefficient per variable name, plus an [`INTERCEPT`] entry
    fn vars_coefs(&self) -> BTreeMap<String, f64> {
        let m = self.model();
        let mut out: BTreeMap<String, f64> = m.used_vars.iter().cloned().zip(m.coefs.iter().copied()).collect();
        out.insert(INTERCEPT.to_string(), m.intercept);
        out
    }

    fn score(&self) -> f64 {
        self.model().score
    }

    /// In-sample mean absolute error
    fn mae(&self) -> f64 {
        self.model().mae()
    }

    /// In-sample mean squared error
    fn mse(&self) -> f64 {
        self.model().mse()
    }

    fn predict_point(&self, point: &Observation) -> Result<f64> {
        self.model().predict(point)
    }

    fn predict_points(&self, points: &[Observation]) -> Result<Vec<f64>> {
        points.iter().map(|p| self.predict_point(p)).collect()
    }

    /// Evaluate the model on every cell of `raster_data` (layer × row × col),
    /// whose layers are named by `field_names`.
    fn apply_regression(&self, raster_data: ArrayViewD<'_, f64>, field_names: &[String]) -> Result<Array2<f64>> {
        apply_model(self.model(), raster_data, field_names)
    }
}

pub(crate) fn apply_model(
    model: &FittedModel,
    raster_data: ArrayViewD<'_, f64>,
    field_names: &[String],
) -> Result<Array2<f64>> {
    if raster_data.ndim() != 3 {
        return Err(Error::DimensionMismatch {
            expected: 3,
            actual: raster_data.ndim(),
        });
    }
    let layers = raster_data
        .into_dimensionality::<Ix3>()
        .map_err(|e| Error::Other(e.to_string()))?;
    let (n_layers, rows, cols) = layers.dim();
    if n_layers != field_names.len() {
        return Err(Error::SizeMismatch {
            what: "raster layers and field names",
            expected: vec![field_names.len()],
            actual: vec![n_layers],
        });
    }

    let mut field = Array2::from_elem((rows, cols), model.intercept);
    for (var, coef) in model.used_vars.iter().zip(&model.coefs) {
        let index = field_names
            .iter()
            .position(|n| n == var)
            .ok_or_else(|| Error::UnknownField(var.clone()))?;
        field.scaled_add(*coef, &layers.index_axis(Axis(0), index));
    }
    Ok(field)
}

#[cfg(test)]
pub(crate) mod test_data {
    use mica_core::Observation;

    /// value = 1 + altitude + 2·dist, exactly
    pub fn perfect_fit() -> Vec<Observation> {
        [(0.0, 4.0), (0.5, 3.0), (1.0, 2.0), (2.0, 1.0), (3.0, 0.5), (4.0, 0.0), (1.0, 1.0)]
            .iter()
            .enumerate()
            .map(|(i, &(alt, dist))| {
                Observation::new(format!("P{i}"), i as f64, 0.0, 1.0 + alt + 2.0 * dist)
                    .with_field("altitude", alt)
                    .with_field("dist", dist)
            })
            .collect()
    }

    /// value = altitude, with a constant `dist`
    pub fn general_data() -> Vec<Observation> {
        vec![
            Observation::new("AA", 0.0, 0.0, 0.0).with_field("altitude", 0.0).with_field("dist", 0.0),
            Observation::new("BB", 1.0, 1.0, 0.5).with_field("altitude", 0.5).with_field("dist", 0.0),
            Observation::new("CC", 2.0, 2.0, 1.0).with_field("altitude", 1.0).with_field("dist", 0.0),
        ]
    }

    /// value = 1 + hr + 2·dist + 3·altitude on a 2 x 2 x 2 design
    pub fn cube() -> Vec<Observation> {
        let mut out = Vec::new();
        for alt in 0..2 {
            for hr in 0..2 {
                for dist in 0..2 {
                    let (a, h, d) = (alt as f64, hr as f64, dist as f64);
                    out.push(
                        Observation::new(format!("key_{}", out.len() + 1), out.len() as f64, 0.0, 1.0 + h + 2.0 * d + 3.0 * a)
                            .with_field("altitude", a)
                            .with_field("hr", h)
                            .with_field("dist", d),
                    );
                }
            }
        }
        out
    }

    pub fn names(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|v| v.to_string()).collect()
    }
}
