//! Field estimation from station observations
//!
//! An [`Estimator`] is built once per method from a [`ConfigFile`] and a
//! [`Catalog`], then [`interpolate`](Estimator::interpolate)s batches of
//! observations onto the configured grid:
//!
//! - `id2d` / `id3d`: inverse distance on the observed values
//! - `mlr`: regression on the predictor rasters (clustered when cluster
//!   candidates are configured)
//! - `mlr+id2d` / `mlr+id3d`: regression field minus the interpolated
//!   regression residuals

mod config;
mod method;

pub use config::{
    ClusterFiles, ConfigFile, EstimatorConfig, DEFAULT_ID_PENALIZATION, DEFAULT_ID_POWER, DEFAULT_ID_SMOOTHING,
};
pub use method::{Kernel, Method};

use mica_core::{
    check_unique_ids, Catalog, Error, GeoTransform, IdentityTransform, Observation, PointTransform, Raster,
    RasterStack, RegionMembership, Result, ALTITUDE, CRS,
};
use ndarray::{Array2, Array3};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::interpolation::{
    inverse_distance, inverse_distance_3d, InverseDistance3dParams, InverseDistanceParams, SamplePoint, SamplePoint3,
};
use crate::regression::{ClusteredRegression, Regression, SigmaRegression};

/// Estimates a field on a fixed grid with one method.
pub struct Estimator {
    config: EstimatorConfig,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    crs: CRS,
    predictors: Option<RasterStack>,
    clusters: Vec<Arc<dyn RegionMembership>>,
    masks: Vec<Array3<f64>>,
    point_transform: Box<dyn PointTransform>,
    field: Option<Array2<f64>>,
}

impl Estimator {
    /// Resolve the configuration of `method` and load its inputs.
    pub fn new(method: Method, config: &ConfigFile, catalog: &dyn Catalog) -> Result<Self> {
        let config = config.resolve(method)?;
        let (rows, cols) = config.grid_shape();
        let [xmin, _, _, ymax] = config.interpolation_bounds;
        let transform = GeoTransform::from_bounds(xmin, ymax, config.resolution);
        let crs = CRS::from_epsg(config.epsg);

        let predictors = if method.needs_predictors() {
            Some(load_predictors(&config, catalog, rows, cols, &transform, &crs)?)
        } else {
            None
        };

        let (clusters, masks) = match &config.clusters {
            Some(files) if method.uses_regression() => load_clusters(files, catalog, rows, cols)?,
            _ => (Vec::new(), Vec::new()),
        };

        info!(%method, rows, cols, crs = %crs, "estimator ready");
        Ok(Self {
            config,
            rows,
            cols,
            transform,
            crs,
            predictors,
            clusters,
            masks,
            point_transform: Box::new(IdentityTransform),
            field: None,
        })
    }

    /// Use `transform` to turn station lon/lat into grid coordinates
    pub fn with_point_transform(mut self, transform: Box<dyn PointTransform>) -> Self {
        self.point_transform = transform;
        self
    }

    pub fn method(&self) -> Method {
        self.config.method
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Output grid size as (rows, cols)
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn predictors(&self) -> Option<&RasterStack> {
        self.predictors.as_ref()
    }

    /// Estimate the field from `points` and keep it as the current result.
    pub fn interpolate(&mut self, points: &[Observation]) -> Result<Array2<f64>> {
        self.validate(points)?;
        let points = self.point_transform.project_points(points)?;
        let method = self.config.method;

        let field = match method {
            Method::Id2d => self.planar(points.iter().map(|p| SamplePoint::new(p.x, p.y, p.value)).collect())?,
            Method::Id3d => self.with_altitude(altitude_samples(&points, |p| Ok(p.value))?)?,
            Method::Mlr => self.regression(&points)?.0,
            Method::MlrId2d | Method::MlrId3d => {
                let (trend, residuals) = self.regression(&points)?;
                let residual_of = |p: &Observation| {
                    residuals
                        .get(&p.id)
                        .copied()
                        .ok_or_else(|| Error::Algorithm(format!("no regression residual for {}", p.id)))
                };
                let correction = if method == Method::MlrId2d {
                    let samples = points
                        .iter()
                        .map(|p| Ok(SamplePoint::new(p.x, p.y, residual_of(p)?)))
                        .collect::<Result<Vec<_>>>()?;
                    self.planar(samples)?
                } else {
                    self.with_altitude(altitude_samples(&points, residual_of)?)?
                };
                trend - correction
            }
        };

        self.field = Some(field.clone());
        Ok(field)
    }

    /// The last estimated field, georeferenced on the output grid
    pub fn field(&self) -> Option<Raster<f64>> {
        self.field.as_ref().map(|data| {
            let mut raster = Raster::georeferenced(data.clone(), self.transform, Some(self.crs.clone()));
            raster.set_nodata(Some(f64::NAN));
            raster
        })
    }

    /// Human-readable description of the method and its parameters
    pub fn summary(&self) -> String {
        self.to_string()
    }

    fn validate(&self, points: &[Observation]) -> Result<()> {
        if points.is_empty() {
            return Err(Error::InvalidParameter {
                name: "points",
                value: "0".into(),
                reason: "at least one observation is needed".into(),
            });
        }
        check_unique_ids(points)?;
        let method = self.config.method;
        for p in points {
            if method.needs_altitude() {
                p.altitude()?;
            }
            if method.uses_regression() {
                p.require_fields(&self.config.predictor_names())?;
            }
        }
        Ok(())
    }

    fn planar(&self, samples: Vec<SamplePoint>) -> Result<Array2<f64>> {
        let params = InverseDistanceParams {
            power: self.config.id_power,
            smoothing: self.config.id_smoothing,
            rows: self.rows,
            cols: self.cols,
            transform: self.transform,
        };
        Ok(inverse_distance(&samples, params)?.into_array())
    }

    fn with_altitude(&self, samples: Vec<SamplePoint3>) -> Result<Array2<f64>> {
        let altitude = self
            .predictors
            .as_ref()
            .and_then(|stack| stack.layer(ALTITUDE))
            .ok_or_else(|| Error::UnknownField(ALTITUDE.to_string()))?;
        let params = InverseDistance3dParams {
            power: self.config.id_power,
            smoothing: self.config.id_smoothing,
            penalization: self.config.id_penalization,
            rows: self.rows,
            cols: self.cols,
            transform: self.transform,
        };
        Ok(inverse_distance_3d(&samples, altitude, params)?.into_array())
    }

    /// Regression field on the grid and `predicted − observed` per station
    fn regression(&self, points: &[Observation]) -> Result<(Array2<f64>, BTreeMap<String, f64>)> {
        let stack = self
            .predictors
            .as_ref()
            .ok_or_else(|| Error::Other("no predictor rasters loaded".into()))?;
        let names = stack.names().to_vec();
        let params = self.config.regression;

        if self.clusters.is_empty() {
            let reg = SigmaRegression::fit(points, &names, params.score_threshold, params.sigma_limit)?;
            debug!(used = ?reg.used_vars(), score = reg.score(), "regression fitted");
            let field = reg.apply_regression(stack.data_dyn(), &names)?;
            return Ok((field, reg.residuals()));
        }

        let reg = ClusteredRegression::fit(points, &self.clusters, &names, params)?;
        let field = match reg.selected_candidate() {
            Some(i) => reg.apply_clustered_regression(stack.data_dyn(), &names, self.masks[i].view())?,
            None => reg.global().apply_regression(stack.data_dyn(), &names)?,
        };
        // stations outside every region keep their global residual
        let mut residuals = reg.global().residuals();
        residuals.extend(reg.residuals());
        Ok((field, residuals))
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config)
    }
}

fn altitude_samples<F>(points: &[Observation], value_of: F) -> Result<Vec<SamplePoint3>>
where
    F: Fn(&Observation) -> Result<f64>,
{
    points
        .iter()
        .map(|p| Ok(SamplePoint3::new(p.x, p.y, p.altitude()?, value_of(p)?)))
        .collect()
}

fn load_predictors(
    config: &EstimatorConfig,
    catalog: &dyn Catalog,
    rows: usize,
    cols: usize,
    transform: &GeoTransform,
    crs: &CRS,
) -> Result<RasterStack> {
    let layers = config
        .variables_files
        .iter()
        .map(|(name, path)| Ok((name.clone(), catalog.raster(path)?)))
        .collect::<Result<Vec<_>>>()?;
    let stack = RasterStack::from_rasters(layers)?;

    let first = stack.names().first().cloned().unwrap_or_default();
    if stack.grid_shape() != (rows, cols) {
        let (r, c) = stack.grid_shape();
        return Err(Error::SizeMismatch {
            what: "predictor rasters and output grid",
            expected: vec![rows, cols],
            actual: vec![r, c],
        });
    }
    let crs_matches = stack.crs().is_some_and(|c| c.is_equivalent(crs));
    if !stack.transform().approx_eq(transform, 1e-9 * config.resolution) || !crs_matches {
        return Err(Error::MisalignedPredictors(first));
    }
    if config.method.needs_altitude() && stack.index_of(ALTITUDE).is_none() {
        return Err(Error::InvalidConfigValue {
            key: "variables_files",
            reason: format!("{} needs an {ALTITUDE} field", config.method),
        });
    }
    Ok(stack)
}

type LoadedClusters = (Vec<Arc<dyn RegionMembership>>, Vec<Array3<f64>>);

fn load_clusters(files: &ClusterFiles, catalog: &dyn Catalog, rows: usize, cols: usize) -> Result<LoadedClusters> {
    let mut clusters = Vec::with_capacity(files.clusters_files.len());
    let mut masks = Vec::with_capacity(files.mask_files.len());
    for (cluster_path, mask_path) in files.clusters_files.iter().zip(&files.mask_files) {
        let regions = catalog.regions(cluster_path)?;
        let mask = catalog.mask(mask_path)?;
        let expected = (regions.region_count(), rows, cols);
        if mask.dim() != expected {
            return Err(Error::SizeMismatch {
                what: "cluster mask",
                expected: vec![expected.0, expected.1, expected.2],
                actual: mask.shape().to_vec(),
            });
        }
        clusters.push(regions);
        masks.push(mask);
    }
    Ok((clusters, masks))
}
