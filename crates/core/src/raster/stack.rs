//! Aligned stack of named predictor layers

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use ndarray::{Array3, ArrayView2, ArrayView3, ArrayViewD, Axis};

/// Tolerance used when comparing the geotransforms of stacked layers
const TRANSFORM_TOLERANCE: f64 = 1e-9;

/// Predictor layers sharing one grid.
///
/// Layer `i` of [`data`](Self::data) holds the field named `names()[i]`.
/// Layers keep the order in which they were supplied.
#[derive(Debug, Clone)]
pub struct RasterStack {
    names: Vec<String>,
    data: Array3<f64>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl RasterStack {
    /// Stack named rasters, checking they share geotransform, CRS and shape.
    pub fn from_rasters<I, S>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Raster<f64>)>,
        S: Into<String>,
    {
        let layers: Vec<(String, Raster<f64>)> =
            layers.into_iter().map(|(n, r)| (n.into(), r)).collect();

        let (first_name, first) = layers.first().ok_or_else(|| Error::InvalidParameter {
            name: "layers",
            value: "0".into(),
            reason: "a raster stack needs at least one layer".into(),
        })?;
        let (rows, cols) = first.shape();
        let transform = *first.transform();
        let crs = first.crs().cloned();

        for (name, raster) in &layers {
            let same_crs = match (&crs, raster.crs()) {
                (None, None) => true,
                (Some(a), Some(b)) => a.is_equivalent(b),
                _ => false,
            };
            if raster.shape() != (rows, cols)
                || !raster.transform().approx_eq(&transform, TRANSFORM_TOLERANCE)
                || !same_crs
            {
                tracing::debug!(layer = %name, reference = %first_name, "predictor layer is not aligned");
                return Err(Error::MisalignedPredictors(name.clone()));
            }
        }

        let mut data = Array3::zeros((layers.len(), rows, cols));
        let mut names = Vec::with_capacity(layers.len());
        for (i, (name, raster)) in layers.into_iter().enumerate() {
            data.index_axis_mut(Axis(0), i).assign(raster.data());
            names.push(name);
        }

        Ok(Self {
            names,
            data,
            transform,
            crs,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Grid shape (rows, cols) shared by every layer
    pub fn grid_shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Layer × row × col view
    pub fn data(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    /// The same data as a dynamic-rank view
    pub fn data_dyn(&self) -> ArrayViewD<'_, f64> {
        self.data.view().into_dyn()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// The layer called `name`
    pub fn layer(&self, name: &str) -> Option<ArrayView2<'_, f64>> {
        self.index_of(name)
            .map(|i| self.data.index_axis(Axis(0), i))
    }
}
