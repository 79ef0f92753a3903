//! Stepwise regression refitted without outlying stations

use mica_core::{Observation, Result};
use std::collections::BTreeMap;
use tracing::debug;

use super::{mean, FittedModel, MultiRegression, Regression};

/// Residual magnitude under which a station is never treated as an outlier
const MIN_RESIDUAL_CUTOFF: f64 = 0.1;

/// A [`MultiRegression`] refitted on the stations whose first-pass
/// residual lies within `sigma_limit` standard deviations.
///
/// Residuals are reported for the whole reference set, outliers included.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaRegression {
    model: FittedModel,
    residuals: BTreeMap<String, f64>,
    kept: Vec<String>,
}

impl SigmaRegression {
    pub fn fit(points: &[Observation], candidates: &[String], score_threshold: f64, sigma_limit: f64) -> Result<Self> {
        let first = MultiRegression::fit(points, candidates, score_threshold)?;
        let residuals = points
            .iter()
            .map(|p| Ok(first.predict_point(p)? - p.value))
            .collect::<Result<Vec<f64>>>()?;
        let mu = mean(residuals.iter().copied());
        let sigma = mean(residuals.iter().map(|r| (r - mu).powi(2))).sqrt();
        let cutoff = (sigma_limit * sigma).max(MIN_RESIDUAL_CUTOFF);

        let inliers: Vec<Observation> = points
            .iter()
            .zip(&residuals)
            .filter(|(_, r)| r.abs() < cutoff)
            .map(|(p, _)| p.clone())
            .collect();
        debug!(
            outliers = points.len() - inliers.len(),
            sigma, cutoff, "sigma filter applied"
        );

        let model = MultiRegression::fit(&inliers, candidates, score_threshold)?.into_model();
        let kept = inliers.into_iter().map(|p| p.id).collect();
        Self::from_model(model, kept, points)
    }

    fn from_model(model: FittedModel, kept: Vec<String>, reference: &[Observation]) -> Result<Self> {
        let residuals = reference
            .iter()
            .map(|p| Ok((p.id.clone(), model.predict(p)? - p.value)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            model,
            residuals,
            kept,
        })
    }

    /// The same model with residuals reported for `points` instead.
    pub fn with_reference(&self, points: &[Observation]) -> Result<Self> {
        Self::from_model(self.model.clone(), self.kept.clone(), points)
    }

    /// Ids of the stations the final model was fitted on
    pub fn kept(&self) -> &[String] {
        &self.kept
    }

    /// Mean squared residual over the reference set
    pub fn reference_mse(&self) -> f64 {
        mean(self.residuals.values().map(|r| r * r))
    }
}

impl Regression for SigmaRegression {
    fn model(&self) -> &FittedModel {
        &self.model
    }

    fn residuals(&self) -> BTreeMap<String, f64> {
        self.residuals.clone()
    }
}
