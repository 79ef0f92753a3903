//! Raster grids and predictor stacks

mod element;
mod geotransform;
mod grid;
mod stack;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use stack::RasterStack;
