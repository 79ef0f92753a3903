//! Cell value trait for grids

use num_traits::Float;
use std::fmt::Debug;

/// Types that can be stored in a [`Raster`](super::Raster) cell.
///
/// Estimated fields, predictor layers and masks are all continuous, so
/// only floating point cells are supported. NaN always counts as no-data.
pub trait RasterElement: Float + Debug + Send + Sync + 'static {
    /// No-data marker written into cells that could not be estimated
    fn default_nodata() -> Self {
        Self::nan()
    }

    /// Whether this value is NaN or equal to the explicit no-data value
    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        if self.is_nan() {
            return true;
        }
        match nodata {
            Some(nd) if !nd.is_nan() => (*self - nd).abs() <= Self::epsilon() * (Self::one() + nd.abs()),
            _ => false,
        }
    }
}

impl RasterElement for f32 {}
impl RasterElement for f64 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f32::NAN.is_nodata(Some(-9999.0)));
        assert!((-9999.0_f64).is_nodata(Some(-9999.0)));
        assert!(!0.0_f64.is_nodata(None));
        assert!(!0.0_f64.is_nodata(Some(f64::NAN)));
    }
}
