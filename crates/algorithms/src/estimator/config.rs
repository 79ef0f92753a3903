//! Estimator configuration
//!
//! The configuration file is a JSON object keyed by method identifier:
//!
//! ```json
//! {
//!   "mlr+id2d": {
//!     "interpolation_bounds": [260000, 4480000, 530000, 4760000],
//!     "resolution": 1000,
//!     "EPSG": 25831,
//!     "variables_files": {"altitude": "dem.tif", "dist": "coast.tif"},
//!     "clusters": {"clusters_files": ["c2.json"], "mask_files": ["c2_mask.tif"]},
//!     "id_power": 2.5
//!   }
//! }
//! ```
//!
//! [`ConfigFile::resolve`] validates one entry into an [`EstimatorConfig`]
//! with every default filled in.

use mica_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::info;

use super::Method;
use crate::regression::RegressionParams;

pub const DEFAULT_ID_POWER: f64 = 2.5;
pub const DEFAULT_ID_SMOOTHING: f64 = 0.0;
pub const DEFAULT_ID_PENALIZATION: f64 = 30.0;

/// Cluster candidates and their blending masks, matched by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterFiles {
    pub clusters_files: Vec<String>,
    pub mask_files: Vec<String>,
}

/// One validated configuration entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub method: Method,
    pub id_power: f64,
    pub id_smoothing: f64,
    pub id_penalization: f64,
    pub regression: RegressionParams,
    /// `[xmin, ymin, xmax, ymax]`
    pub interpolation_bounds: [f64; 4],
    pub resolution: f64,
    pub epsg: u32,
    /// Predictor name → raster path, in file order
    pub variables_files: Vec<(String, String)>,
    pub clusters: Option<ClusterFiles>,
}

impl EstimatorConfig {
    /// Output grid size as (rows, cols)
    pub fn grid_shape(&self) -> (usize, usize) {
        let [xmin, ymin, xmax, ymax] = self.interpolation_bounds;
        (
            ((ymax - ymin) / self.resolution).floor() as usize,
            ((xmax - xmin) / self.resolution).floor() as usize,
        )
    }

    pub fn predictor_names(&self) -> Vec<String> {
        self.variables_files.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl fmt::Display for EstimatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.grid_shape();
        writeln!(f, "method: {}", self.method)?;
        writeln!(
            f,
            "grid: {rows} x {cols} cells of {} (EPSG:{}), bounds {:?}",
            self.resolution, self.epsg, self.interpolation_bounds
        )?;
        if let Some(kernel) = self.method.kernel() {
            write!(f, "kernel: {kernel:?}, power {}, smoothing {}", self.id_power, self.id_smoothing)?;
            if self.method.needs_altitude() {
                write!(f, ", penalization {}", self.id_penalization)?;
            }
            writeln!(f)?;
        }
        if self.method.uses_regression() {
            writeln!(
                f,
                "regression: sigma_limit {}, score_threshold {}",
                self.regression.sigma_limit, self.regression.score_threshold
            )?;
        }
        if !self.variables_files.is_empty() {
            writeln!(f, "predictors: {}", self.predictor_names().join(", "))?;
        }
        if let Some(c) = &self.clusters {
            writeln!(f, "clusters: {} candidate definitions", c.clusters_files.len())?;
        }
        Ok(())
    }
}

/// A parsed configuration file, one entry per method.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    methods: Map<String, Value>,
}

impl ConfigFile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(methods) => Ok(Self { methods }),
            _ => Err(Error::InvalidConfigType {
                key: "configuration",
                expected: "an object keyed by method",
            }),
        }
    }

    /// Validate the entry of `method` and fill in defaults.
    pub fn resolve(&self, method: Method) -> Result<EstimatorConfig> {
        let entry = self
            .methods
            .get(method.as_str())
            .ok_or_else(|| Error::MethodNotConfigured(method.to_string()))?
            .as_object()
            .ok_or(Error::InvalidConfigType {
                key: "method entry",
                expected: "an object",
            })?;
        let entry = Entry { method, map: entry };

        let interpolation_bounds = entry.bounds()?;
        let resolution = entry.required_f64("resolution")?;
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(Error::InvalidConfigValue {
                key: "resolution",
                reason: format!("must be positive, got {resolution}"),
            });
        }
        let epsg = entry.epsg()?;

        let kernel = method.kernel().is_some();
        let id_power = entry.optional_f64("id_power", DEFAULT_ID_POWER, kernel)?;
        let id_smoothing = entry.optional_f64("id_smoothing", DEFAULT_ID_SMOOTHING, kernel)?;
        let id_penalization = entry.optional_f64("id_penalization", DEFAULT_ID_PENALIZATION, method.needs_altitude())?;

        let defaults = RegressionParams::default();
        let regression = RegressionParams {
            sigma_limit: entry.optional_f64("sigma_limit", defaults.sigma_limit, method.uses_regression())?,
            score_threshold: entry.optional_f64("score_threshold", defaults.score_threshold, method.uses_regression())?,
        };

        let variables_files = if method.needs_predictors() {
            entry.variables_files()?
        } else {
            Vec::new()
        };
        let clusters = if method.uses_regression() {
            entry.clusters()?
        } else {
            None
        };

        let config = EstimatorConfig {
            method,
            id_power,
            id_smoothing,
            id_penalization,
            regression,
            interpolation_bounds,
            resolution,
            epsg,
            variables_files,
            clusters,
        };
        let (rows, cols) = config.grid_shape();
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidConfigValue {
                key: "resolution",
                reason: format!("{resolution} leaves no cell inside the interpolation bounds"),
            });
        }
        Ok(config)
    }
}

struct Entry<'a> {
    method: Method,
    map: &'a Map<String, Value>,
}

impl Entry<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn require(&self, key: &'static str) -> Result<&Value> {
        self.get(key).ok_or_else(|| Error::MissingConfigKey {
            method: self.method.to_string(),
            key,
        })
    }

    fn required_f64(&self, key: &'static str) -> Result<f64> {
        self.require(key)?.as_f64().ok_or(Error::InvalidConfigType {
            key,
            expected: "a number",
        })
    }

    /// A number, or `default` when absent. The substitution is reported
    /// when the key matters to the method.
    fn optional_f64(&self, key: &'static str, default: f64, relevant: bool) -> Result<f64> {
        match self.get(key) {
            Some(v) => v.as_f64().ok_or(Error::InvalidConfigType {
                key,
                expected: "a number",
            }),
            None => {
                if relevant {
                    info!("{key} not in the configuration dictionary. {key} set to default value of {default}.");
                }
                Ok(default)
            }
        }
    }

    fn bounds(&self) -> Result<[f64; 4]> {
        const KEY: &str = "interpolation_bounds";
        let not_numbers = Error::InvalidConfigType {
            key: KEY,
            expected: "a list of numbers",
        };
        let list = self.require(KEY)?.as_array().ok_or(Error::InvalidConfigType {
            key: KEY,
            expected: "a list of numbers",
        })?;
        let values = list
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<f64>>>()
            .ok_or(not_numbers)?;
        let [xmin, ymin, xmax, ymax]: [f64; 4] = values.as_slice().try_into().map_err(|_| Error::InvalidConfigValue {
            key: KEY,
            reason: format!("expected [xmin, ymin, xmax, ymax], got {} values", values.len()),
        })?;
        if xmin >= xmax || ymin >= ymax {
            return Err(Error::InvalidConfigValue {
                key: KEY,
                reason: format!("empty extent {values:?}"),
            });
        }
        Ok([xmin, ymin, xmax, ymax])
    }

    fn epsg(&self) -> Result<u32> {
        self.require("EPSG")?
            .as_u64()
            .and_then(|code| u32::try_from(code).ok())
            .ok_or(Error::InvalidConfigType {
                key: "EPSG",
                expected: "an integer code",
            })
    }

    fn variables_files(&self) -> Result<Vec<(String, String)>> {
        const KEY: &str = "variables_files";
        let map = self.require(KEY)?.as_object().ok_or(Error::InvalidConfigType {
            key: KEY,
            expected: "an object mapping field names to paths",
        })?;
        if map.is_empty() {
            return Err(Error::InvalidConfigValue {
                key: KEY,
                reason: format!("{} needs at least one predictor", self.method),
            });
        }
        map.iter()
            .map(|(name, path)| {
                path.as_str()
                    .map(|p| (name.clone(), p.to_string()))
                    .ok_or(Error::InvalidConfigType {
                        key: KEY,
                        expected: "an object mapping field names to paths",
                    })
            })
            .collect()
    }

    fn clusters(&self) -> Result<Option<ClusterFiles>> {
        let value = match self.get("clusters") {
            None => return Ok(None),
            Some(Value::String(s)) if s == "None" => return Ok(None),
            Some(v) => v,
        };
        let Some(obj) = value.as_object() else {
            return Err(Error::InvalidConfigType {
                key: "clusters",
                expected: "null, \"None\" or an object with clusters_files and mask_files",
            });
        };

        let clusters_files = obj
            .get("clusters_files")
            .ok_or_else(|| Error::MissingConfigKey {
                method: self.method.to_string(),
                key: "clusters_files",
            })?
            .as_array()
            .ok_or(Error::ClusterDefinitionsNotList)?;
        let clusters_files = strings(clusters_files, "clusters_files")?;

        let mask_files = obj
            .get("mask_files")
            .ok_or_else(|| Error::MissingConfigKey {
                method: self.method.to_string(),
                key: "mask_files",
            })?
            .as_array()
            .ok_or(Error::InvalidConfigType {
                key: "mask_files",
                expected: "a list of paths",
            })?;
        let mask_files = strings(mask_files, "mask_files")?;

        if mask_files.len() != clusters_files.len() {
            return Err(Error::InvalidConfigValue {
                key: "mask_files",
                reason: format!(
                    "{} masks for {} cluster definitions",
                    mask_files.len(),
                    clusters_files.len()
                ),
            });
        }
        Ok(Some(ClusterFiles {
            clusters_files,
            mask_files,
        }))
    }
}

fn strings(values: &[Value], key: &'static str) -> Result<Vec<String>> {
    values
        .iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or(Error::InvalidConfigType {
                key,
                expected: "a list of paths",
            })
        })
        .collect()
}
