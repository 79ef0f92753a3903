//! Affine geotransformation for grids

use serde::{Deserialize, Serialize};

/// Affine transformation between grid indices and projected coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Output grids built from interpolation bounds are north-up, so the
/// rotations are 0 and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size along X
    pub pixel_width: f64,
    /// Cell size along Y (negative for north-up grids)
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform without rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Transform of a square-celled grid whose upper-left corner is
    /// `(xmin, ymax)`: `(xmin, res, 0, ymax, 0, -res)`.
    pub fn from_bounds(xmin: f64, ymax: f64, resolution: f64) -> Self {
        Self::new(xmin, ymax, resolution, -resolution)
    }

    /// Build from a GDAL-ordered array
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        let [origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height] = coeffs;
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation,
            col_rotation,
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Coordinates of grid node `(col, row)`.
    ///
    /// Nodes sit on the cell corners (`origin + index * size`), which is
    /// where interpolation kernels and masks are evaluated.
    pub fn node(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    /// Coordinates of the centre of cell `(col, row)`
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Fractional `(col, row)` of a projected position.
    ///
    /// Returns NaNs for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        (
            (self.pixel_height * dx - self.row_rotation * dy) / det,
            (self.pixel_width * dy - self.col_rotation * dx) / det,
        )
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of a `cols x rows` grid
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.node(0, 0),
            self.node(cols, 0),
            self.node(0, rows),
            self.node(cols, rows),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }

    /// Coefficient-wise comparison with an absolute tolerance
    pub fn approx_eq(&self, other: &GeoTransform, tolerance: f64) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
