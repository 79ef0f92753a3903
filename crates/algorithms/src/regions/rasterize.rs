//! Blending masks from polygon regions

use crate::maybe_rayon::*;
use mica_core::{Error, GeoTransform, Result};
use ndarray::{Array2, Array3, ArrayView2, Axis};

use super::PolygonRegions;

/// Rasterize each region onto the grid: 1.0 at nodes inside the region,
/// 0.0 elsewhere (region × row × col).
///
/// With `blur_sigma`, each layer is smoothed by a normalized Gaussian of
/// radius ⌈3σ⌉ cells so neighbouring regions blend across their border.
pub fn rasterize_regions(
    regions: &PolygonRegions,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    blur_sigma: Option<f64>,
) -> Result<Array3<f64>> {
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    if let Some(sigma) = blur_sigma {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "blur_sigma",
                value: sigma.to_string(),
                reason: "must be a positive number".into(),
            });
        }
    }

    let n = regions.regions().len();
    let mut masks = Array3::<f64>::zeros((n, rows, cols));
    for (region, mut layer) in masks.axis_iter_mut(Axis(0)).enumerate() {
        let data: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                (0..cols)
                    .map(|col| {
                        let (x, y) = transform.node(col, row);
                        if regions.contains_xy(region, x, y) {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect::<Vec<f64>>()
            })
            .collect();
        let binary = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
        match blur_sigma {
            Some(sigma) => layer.assign(&gaussian_blur(binary.view(), sigma)?),
            None => layer.assign(&binary),
        }
    }
    Ok(masks)
}

fn gaussian_blur(layer: ArrayView2<'_, f64>, sigma: f64) -> Result<Array2<f64>> {
    let (rows, cols) = layer.dim();
    let r = (3.0 * sigma).ceil() as isize;
    let size = (2 * r + 1) as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel = vec![0.0_f64; size * size];
    for dr in -r..=r {
        for dc in -r..=r {
            let idx = ((dr + r) as usize) * size + (dc + r) as usize;
            kernel[idx] = (-((dr * dr + dc * dc) as f64) / two_sigma_sq).exp();
        }
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let mut sum = 0.0;
                let mut wsum = 0.0;
                for dr in -r..=r {
                    let nr = row as isize + dr;
                    if nr < 0 || nr as usize >= rows {
                        continue;
                    }
                    for dc in -r..=r {
                        let nc = col as isize + dc;
                        if nc < 0 || nc as usize >= cols {
                            continue;
                        }
                        let w = kernel[((dr + r) as usize) * size + (dc + r) as usize];
                        sum += w * layer[(nr as usize, nc as usize)];
                        wsum += w;
                    }
                }
                *out = sum / wsum;
            }
            row_data
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}
