//! Best regional regression among candidate cluster definitions
//!
//! For each candidate, every region gets either its own sigma-filtered
//! model or the global one, whichever has the lower mean squared residual
//! over the region's stations. The candidate with the lowest station-weighted
//! error is adopted. Stations in overlapping regions are counted once per
//! region.

use mica_core::{Error, Observation, RegionMembership, Result};
use ndarray::{Array2, ArrayView3, ArrayViewD, Axis, Zip};
use std::collections::BTreeMap;
use tracing::debug;

use super::{Regression, RegressionParams, SigmaRegression};

#[derive(Debug, Clone)]
struct Selection<C> {
    candidate: usize,
    regions: C,
    models: Vec<SigmaRegression>,
    partition: Vec<Vec<usize>>,
    mse: f64,
}

/// Per-region regressions of the best candidate cluster definition.
#[derive(Debug, Clone)]
pub struct ClusteredRegression<C> {
    global: SigmaRegression,
    selection: Option<Selection<C>>,
}

impl<C: RegionMembership + Clone> ClusteredRegression<C> {
    pub fn fit(points: &[Observation], candidates: &[C], predictors: &[String], params: RegressionParams) -> Result<Self> {
        let global = SigmaRegression::fit(points, predictors, params.score_threshold, params.sigma_limit)?;

        let mut best = f64::MAX;
        let mut selection = None;

        for (index, candidate) in candidates.iter().enumerate() {
            let partition = candidate.partition(points);
            let data_used: usize = partition.iter().map(Vec::len).sum();
            if data_used == 0 {
                debug!(candidate = index, "no station falls in any region");
                continue;
            }

            let mut weighted_mse = 0.0;
            let mut models = Vec::with_capacity(partition.len());
            for (region, members) in partition.iter().enumerate() {
                let region_points: Vec<Observation> = members.iter().map(|&i| points[i].clone()).collect();
                let (model, mse) = choose_region_model(&global, &region_points, predictors, params)?;
                debug!(candidate = index, region, stations = members.len(), mse, "region model chosen");
                weighted_mse += mse * members.len() as f64;
                models.push(model);
            }

            let file_mse = weighted_mse / data_used as f64;
            debug!(candidate = index, file_mse, "candidate scored");
            if file_mse <= best {
                best = file_mse;
                selection = Some(Selection {
                    candidate: index,
                    regions: candidate.clone(),
                    models,
                    partition,
                    mse: file_mse,
                });
            }
        }

        if let Some(s) = &selection {
            debug!(candidate = s.candidate, mse = s.mse, "cluster definition adopted");
        }
        Ok(Self { global, selection })
    }

    /// The model fitted on every station
    pub fn global(&self) -> &SigmaRegression {
        &self.global
    }

    /// Index of the adopted candidate, `None` when the global model is used
    pub fn selected_candidate(&self) -> Option<usize> {
        self.selection.as_ref().map(|s| s.candidate)
    }

    /// One model per region of the adopted candidate, or the global model alone
    pub fn models(&self) -> &[SigmaRegression] {
        match &self.selection {
            Some(s) => &s.models,
            None => std::slice::from_ref(&self.global),
        }
    }

    /// Station indices per region of the adopted candidate
    pub fn partition(&self) -> Option<&[Vec<usize>]> {
        self.selection.as_ref().map(|s| s.partition.as_slice())
    }

    /// Station-weighted mean squared residual of the adopted configuration
    pub fn mse(&self) -> f64 {
        match &self.selection {
            Some(s) => s.mse,
            None => self.global.mse(),
        }
    }

    /// Residuals of every region model; a station in several regions keeps
    /// the value of the last one.
    pub fn residuals(&self) -> BTreeMap<String, f64> {
        match &self.selection {
            Some(s) => s.models.iter().flat_map(|m| m.residuals()).collect(),
            None => self.global.residuals(),
        }
    }

    /// Predictions in input order. A station outside every region of the
    /// adopted candidate gets `None`.
    pub fn predict_points(&self, points: &[Observation]) -> Result<Vec<Option<f64>>> {
        let Some(s) = &self.selection else {
            return points.iter().map(|p| self.global.predict_point(p).map(Some)).collect();
        };
        points
            .iter()
            .map(|p| {
                (0..s.regions.region_count())
                    .rev()
                    .find(|&r| s.regions.contains(r, p))
                    .map(|r| s.models[r].predict_point(p))
                    .transpose()
            })
            .collect()
    }

    /// Blend the region models over the grid: Σ fieldᵢ·maskᵢ / Σ maskᵢ.
    ///
    /// `mask` is region × row × col. Cells no region covers are NaN. Without
    /// an adopted candidate this is the global model's field.
    pub fn apply_clustered_regression(
        &self,
        raster_data: ArrayViewD<'_, f64>,
        field_names: &[String],
        mask: ArrayView3<'_, f64>,
    ) -> Result<Array2<f64>> {
        let Some(s) = &self.selection else {
            return self.global.apply_regression(raster_data, field_names);
        };

        let (n_masks, mask_rows, mask_cols) = mask.dim();
        if n_masks != s.models.len() {
            return Err(Error::SizeMismatch {
                what: "mask layers and regions",
                expected: vec![s.models.len()],
                actual: vec![n_masks],
            });
        }

        let mut numerator = Array2::<f64>::zeros((mask_rows, mask_cols));
        let mut denominator = Array2::<f64>::zeros((mask_rows, mask_cols));
        for (model, weights) in s.models.iter().zip(mask.axis_iter(Axis(0))) {
            let field = model.apply_regression(raster_data.clone(), field_names)?;
            if field.dim() != (mask_rows, mask_cols) {
                return Err(Error::SizeMismatch {
                    what: "mask grid",
                    expected: vec![field.nrows(), field.ncols()],
                    actual: vec![mask_rows, mask_cols],
                });
            }
            Zip::from(&mut numerator)
                .and(&mut denominator)
                .and(&field)
                .and(&weights)
                .for_each(|num, den, &f, &w| {
                    if w != 0.0 {
                        *num += f * w;
                        *den += w;
                    }
                });
        }

        Ok(Zip::from(&numerator)
            .and(&denominator)
            .map_collect(|&num, &den| if den == 0.0 { f64::NAN } else { num / den }))
    }
}

/// The region's own model when it beats the global one on the region's
/// stations, else the global model re-tagged with them. Returns the
/// chosen model and its mean squared residual.
fn choose_region_model(
    global: &SigmaRegression,
    region_points: &[Observation],
    predictors: &[String],
    params: RegressionParams,
) -> Result<(SigmaRegression, f64)> {
    let fallback = global.with_reference(region_points)?;
    if region_points.is_empty() {
        return Ok((fallback, 0.0));
    }
    let mse_all = fallback.reference_mse();

    match SigmaRegression::fit(region_points, predictors, params.score_threshold, params.sigma_limit) {
        Ok(own) if mse_all > own.reference_mse() => {
            let mse = own.reference_mse();
            Ok((own, mse))
        }
        Ok(_) => Ok((fallback, mse_all)),
        Err(e) => {
            debug!(error = %e, "region fit failed, using the global model");
            Ok((fallback, mse_all))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::AssignedRegions;
    use crate::regression::test_data::names;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    /// West stations follow value = 1 + 2·altitude; east stations share
    /// one altitude, so no regression can be fitted on them alone.
    fn stations() -> Vec<Observation> {
        let mut pts: Vec<Observation> = (0..5)
            .map(|a| {
                let alt = a as f64;
                Observation::new(format!("W{a}"), 10.0 + 5.0 * alt, 50.0, 1.0 + 2.0 * alt).with_field("altitude", alt)
            })
            .collect();
        for (k, v) in [20.0, 22.0, 18.0, 21.0].into_iter().enumerate() {
            pts.push(Observation::new(format!("E{k}"), 70.0 + 5.0 * k as f64, 50.0, v).with_field("altitude", 5.0));
        }
        pts
    }

    fn west_east() -> AssignedRegions {
        let mut regions = AssignedRegions::new(2);
        for i in 0..5 {
            regions.assign(format!("W{i}"), 0);
        }
        for i in 0..4 {
            regions.assign(format!("E{i}"), 1);
        }
        regions
    }

    fn single() -> AssignedRegions {
        let mut regions = AssignedRegions::new(1);
        for p in stations() {
            regions.assign(p.id, 0);
        }
        regions
    }

    fn params() -> RegressionParams {
        RegressionParams::default()
    }

    #[test]
    fn test_both_branches() {
        let pts = stations();
        let reg = ClusteredRegression::fit(&pts, &[west_east()], &names(&["altitude"]), params()).unwrap();
        assert_eq!(reg.selected_candidate(), Some(0));

        let models = reg.models();
        assert_eq!(models.len(), 2);
        // west: own model
        let (coefs, intercept) = models[0].coefs();
        assert_relative_eq!(coefs[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(intercept, 1.0, epsilon = 1e-9);
        // east: degenerate, global model
        assert_eq!(models[1].model(), reg.global().model());
        assert_relative_eq!(reg.global().coefs().0[0], 4.19492, epsilon = 1e-4);

        assert_relative_eq!(reg.mse(), 1.24533, epsilon = 1e-4);
        assert_eq!(reg.residuals().len(), 9);
        assert_relative_eq!(reg.residuals()["W4"], 0.0, epsilon = 1e-9);
        assert_relative_eq!(reg.residuals()["E1"], -2.53390, epsilon = 1e-4);
    }

    #[test]
    fn test_lone_station_region_uses_global() {
        let pts = stations();
        let mut lone = AssignedRegions::new(3);
        for i in 0..5 {
            lone.assign(format!("W{i}"), 0);
        }
        lone.assign("W0", 1);
        for i in 0..4 {
            lone.assign(format!("E{i}"), 2);
        }
        let reg = ClusteredRegression::fit(&pts, &[lone], &names(&["altitude"]), params()).unwrap();
        let models = reg.models();
        assert_eq!(models[1].model(), reg.global().model());
        assert_eq!(models[1].residuals().len(), 1);
        let expected = reg.global().residuals()["W0"];
        assert_relative_eq!(models[1].residuals()["W0"], expected, epsilon = 1e-12);
        // the lone station counts with its global residual
        assert!(reg.mse() > 0.0);
    }

    #[test]
    fn test_lowest_error_candidate_wins() {
        let pts = stations();
        let reg = ClusteredRegression::fit(&pts, &[single(), west_east()], &names(&["altitude"]), params()).unwrap();
        assert_eq!(reg.selected_candidate(), Some(1));
    }

    #[test]
    fn test_single_region_falls_back_to_global() {
        let pts = stations();
        let reg = ClusteredRegression::fit(&pts, &[single()], &names(&["altitude"]), params()).unwrap();
        assert_eq!(reg.selected_candidate(), Some(0));
        assert_eq!(reg.models()[0].model(), reg.global().model());
        assert_relative_eq!(reg.mse(), 8.56467, epsilon = 1e-4);
    }

    #[test]
    fn test_later_tie_wins() {
        let pts = stations();
        let reg = ClusteredRegression::fit(&pts, &[west_east(), west_east()], &names(&["altitude"]), params()).unwrap();
        assert_eq!(reg.selected_candidate(), Some(1));
    }

    #[test]
    fn test_no_candidate_uses_global() {
        let pts = stations();
        let nobody = AssignedRegions::new(2);
        let reg = ClusteredRegression::fit(&pts, &[nobody], &names(&["altitude"]), params()).unwrap();
        assert_eq!(reg.selected_candidate(), None);
        assert_eq!(reg.models().len(), 1);
        assert_eq!(reg.mse(), reg.global().mse());
        assert!(reg.partition().is_none());
        let predicted = reg.predict_points(&pts).unwrap();
        assert!(predicted.iter().all(Option::is_some));
    }

    #[test]
    fn test_predict_points_outside_regions() {
        let pts = stations();
        let reg = ClusteredRegression::fit(&pts, &[west_east()], &names(&["altitude"]), params()).unwrap();
        let stranger = Observation::new("X", 0.0, 0.0, 0.0).with_field("altitude", 1.0);
        let query = vec![pts[1].clone(), stranger, pts[6].clone()];
        let predicted = reg.predict_points(&query).unwrap();
        assert_relative_eq!(predicted[0].unwrap(), 3.0, epsilon = 1e-9);
        assert!(predicted[1].is_none());
        assert_relative_eq!(
            predicted[2].unwrap(),
            reg.global().predict_point(&pts[6]).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_apply_blends_with_mask() {
        let pts = stations();
        let reg = ClusteredRegression::fit(&pts, &[west_east()], &names(&["altitude"]), params()).unwrap();

        let altitude = Array3::from_elem((1, 1, 3), 2.0);
        let mut mask = Array3::<f64>::zeros((2, 1, 3));
        mask[(0, 0, 0)] = 1.0;
        mask[(0, 0, 1)] = 0.5;
        mask[(1, 0, 1)] = 0.5;

        let field = reg
            .apply_clustered_regression(altitude.view().into_dyn(), &names(&["altitude"]), mask.view())
            .unwrap();
        let west = 5.0;
        let global = reg.global().predict_point(&pts[2]).unwrap();
        assert_relative_eq!(field[(0, 0)], west, epsilon = 1e-9);
        assert_relative_eq!(field[(0, 1)], 0.5 * (west + global), epsilon = 1e-9);
        assert!(field[(0, 2)].is_nan());
    }

    #[test]
    fn test_mask_count_must_match_regions() {
        let pts = stations();
        let reg = ClusteredRegression::fit(&pts, &[west_east()], &names(&["altitude"]), params()).unwrap();
        let altitude = Array3::from_elem((1, 1, 3), 2.0);
        let mask = Array3::<f64>::ones((3, 1, 3));
        let err = reg
            .apply_clustered_regression(altitude.view().into_dyn(), &names(&["altitude"]), mask.view())
            .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }
}
