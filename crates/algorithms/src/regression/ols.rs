//! Least squares with intercept
//!
//! Columns and target are centred, the centred system is solved through an
//! SVD and singular values under `max(n, p) · ε · σ_max` are dropped. A
//! rank-deficient design (a constant column, two identical columns) thus
//! gets the minimum-norm solution instead of an error.

use mica_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Coefficients and intercept of a fitted linear model
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinearFit {
    pub coefs: Vec<f64>,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, row: impl IntoIterator<Item = f64>) -> f64 {
        self.intercept + self.coefs.iter().zip(row).map(|(c, v)| c * v).sum::<f64>()
    }
}

/// Fit `y ≈ intercept + x · coefs` where `x` is n × p.
pub(crate) fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<LinearFit> {
    let n = x.nrows();
    if n == 0 || n != y.len() {
        return Err(Error::Algorithm(format!(
            "OLS: {} design rows for {} observations",
            n,
            y.len()
        )));
    }

    let x_mean = x.row_mean();
    let y_mean = y.mean();

    let mut centred = x.clone();
    for (mut col, mean) in centred.column_iter_mut().zip(x_mean.iter()) {
        col.add_scalar_mut(-mean);
    }
    let y_centred = y.add_scalar(-y_mean);

    let svd = centred.svd(true, true);
    let sigma_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    let tolerance = sigma_max * n.max(x.ncols()) as f64 * f64::EPSILON;
    let beta = svd
        .solve(&y_centred, tolerance)
        .map_err(|e| Error::Algorithm(format!("OLS: {e}")))?;

    let intercept = y_mean - x_mean.iter().zip(beta.iter()).map(|(m, b)| m * b).sum::<f64>();

    Ok(LinearFit {
        coefs: beta.iter().copied().collect(),
        intercept,
    })
}

/// Coefficient of determination, 1 − SSres/SStot.
///
/// A constant target scores 1 when reproduced exactly and 0 otherwise.
/// Fewer than two samples give NaN, which never wins a comparison.
pub(crate) fn r2_score(observed: &[f64], predicted: &[f64]) -> f64 {
    if observed.len() < 2 {
        return f64::NAN;
    }
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let ss_res: f64 = observed.iter().zip(predicted).map(|(o, p)| (o - p).powi(2)).sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}
