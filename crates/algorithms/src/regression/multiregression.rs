//! Greedy stepwise multi-linear regression

use mica_core::{Error, Observation, Result};
use std::collections::BTreeMap;
use tracing::debug;

use super::{FittedModel, Regression};

/// R² is undefined below two stations
const MIN_STATIONS: usize = 2;

/// Linear model whose predictors were chosen one at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiRegression {
    model: FittedModel,
}

impl MultiRegression {
    /// Fit `points` by forward selection over `candidates`.
    ///
    /// Each round tries every remaining candidate together with the
    /// variables already kept and takes the best R² (the earliest candidate
    /// wins a tie, a score ≤ 0 never wins). The winner is kept only if it
    /// raises R² by more than `score_threshold`; otherwise selection stops.
    ///
    /// Fails with [`Error::NoVariableFits`] when nothing is kept, which is
    /// always the case for fewer than two stations.
    pub fn fit(points: &[Observation], candidates: &[String], score_threshold: f64) -> Result<Self> {
        if points.len() < MIN_STATIONS {
            debug!(stations = points.len(), "too few stations to fit");
            return Err(Error::NoVariableFits);
        }
        let mut remaining: Vec<String> = candidates.to_vec();
        let mut used: Vec<String> = Vec::new();
        let mut final_score = 0.0;

        while !remaining.is_empty() {
            let mut best: Option<usize> = None;
            let mut max_score = 0.0;
            for (i, candidate) in remaining.iter().enumerate() {
                let mut trial = used.clone();
                trial.push(candidate.clone());
                let score = FittedModel::fit(points, &trial)?.score;
                if score > max_score {
                    max_score = score;
                    best = Some(i);
                }
            }

            match best {
                Some(i) if max_score - final_score > score_threshold => {
                    let var = remaining.remove(i);
                    debug!(variable = %var, score = max_score, "predictor kept");
                    used.push(var);
                    final_score = max_score;
                }
                _ => break,
            }
        }

        if used.is_empty() {
            return Err(Error::NoVariableFits);
        }

        let model = FittedModel::fit(points, &used)?;
        Ok(Self { model })
    }

    pub fn into_model(self) -> FittedModel {
        self.model
    }
}

impl Regression for MultiRegression {
    fn model(&self) -> &FittedModel {
        &self.model
    }

    fn residuals(&self) -> BTreeMap<String, f64> {
        self.model.residuals.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::test_data::*;
    use crate::regression::INTERCEPT;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_fit() {
        let reg = MultiRegression::fit(&perfect_fit(), &names(&["altitude", "dist"]), 0.05).unwrap();
        // dist alone already explains most of the variance
        assert_eq!(reg.used_vars(), &names(&["dist", "altitude"])[..]);

        let coefs = reg.vars_coefs();
        assert_relative_eq!(coefs["altitude"], 1.0, epsilon = 1e-9);
        assert_relative_eq!(coefs["dist"], 2.0, epsilon = 1e-9);
        assert_relative_eq!(coefs[INTERCEPT], 1.0, epsilon = 1e-9);
        assert_relative_eq!(reg.score(), 1.0, epsilon = 1e-12);
        assert!(reg.mae() < 1e-9);
        assert!(reg.mse() < 1e-18);

        let (values, intercept) = reg.coefs();
        assert_eq!(values.len(), reg.used_vars().len());
        assert_relative_eq!(intercept, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_candidate_is_ignored() {
        let reg = MultiRegression::fit(&general_data(), &names(&["altitude", "dist"]), 0.05).unwrap();
        assert_eq!(reg.used_vars(), &names(&["altitude"])[..]);
        let (coefs, intercept) = reg.coefs();
        assert_relative_eq!(coefs[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(intercept, 0.0, epsilon = 1e-12);

        let query = Observation::new("Q", 0.0, 0.0, 0.0)
            .with_field("dist", 11.0)
            .with_field("altitude", 22.0);
        assert_relative_eq!(reg.predict_point(&query).unwrap(), 22.0, epsilon = 1e-9);
    }

    #[test]
    fn test_threshold_stops_selection() {
        let pts = vec![
            Observation::new("AA", 0.0, 0.0, 0.3).with_field("dist", 0.0).with_field("altitude", 0.0),
            Observation::new("BB", 0.0, 0.0, 0.4).with_field("dist", 0.1).with_field("altitude", 0.5),
            Observation::new("CC", 0.0, 0.0, 1.0).with_field("dist", 0.4).with_field("altitude", 1.0),
        ];
        let both = MultiRegression::fit(&pts, &names(&["altitude", "dist"]), 1e-9).unwrap();
        assert_eq!(both.used_vars().len(), 2);
        assert_relative_eq!(both.score(), 1.0, epsilon = 1e-9);

        let one = MultiRegression::fit(&pts, &names(&["altitude", "dist"]), 0.5).unwrap();
        assert_eq!(one.used_vars(), &names(&["dist"])[..]);
        assert_relative_eq!(one.score(), 0.98792, epsilon = 1e-4);
    }

    #[test]
    fn test_three_predictors() {
        let reg = MultiRegression::fit(&cube(), &names(&["altitude", "dist", "hr"]), 0.05).unwrap();
        assert_eq!(reg.used_vars(), &names(&["altitude", "dist", "hr"])[..]);
        let coefs = reg.vars_coefs();
        assert_relative_eq!(coefs["altitude"], 3.0, epsilon = 1e-9);
        assert_relative_eq!(coefs["dist"], 2.0, epsilon = 1e-9);
        assert_relative_eq!(coefs["hr"], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_variable_fits() {
        let pts: Vec<Observation> = (0..4)
            .map(|i| Observation::new(format!("S{i}"), 0.0, 0.0, i as f64).with_field("dist", 5.0))
            .collect();
        let err = MultiRegression::fit(&pts, &names(&["dist"]), 0.05).unwrap_err();
        assert!(matches!(err, Error::NoVariableFits));
    }

    #[test]
    fn test_too_few_stations() {
        let lone = vec![Observation::new("P0", 0.0, 0.0, 7.0).with_field("altitude", 3.0)];
        let err = MultiRegression::fit(&lone, &names(&["altitude"]), 0.05).unwrap_err();
        assert!(matches!(err, Error::NoVariableFits));
        assert!(matches!(
            MultiRegression::fit(&[], &names(&["altitude"]), 0.05),
            Err(Error::NoVariableFits)
        ));
    }

    #[test]
    fn test_residual_sign() {
        let mut pts = general_data();
        pts.push(Observation::new("DD", 0.0, 0.0, 2.0).with_field("altitude", 2.0).with_field("dist", 0.0));
        pts[0].value = -0.3;
        let reg = MultiRegression::fit(&pts, &names(&["altitude"]), 0.05).unwrap();
        let residuals = reg.residuals();
        assert_eq!(residuals.len(), 4);
        let predicted = reg.predict_points(&pts).unwrap();
        for (p, pred) in pts.iter().zip(predicted) {
            assert_relative_eq!(residuals[&p.id], pred - p.value, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_deterministic() {
        let a = MultiRegression::fit(&cube(), &names(&["hr", "dist", "altitude"]), 0.05).unwrap();
        let b = MultiRegression::fit(&cube(), &names(&["hr", "dist", "altitude"]), 0.05).unwrap();
        assert_eq!(a, b);
    }
}
