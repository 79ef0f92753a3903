//! Coast proximity predictor
//!
//! Distance to the coastline saturates quickly as an explanatory variable,
//! so it enters the regression through `1 − exp(−3d / 100 km)`.

use crate::maybe_rayon::*;
use geo::{Distance, Euclidean, LineString, MultiLineString, Point};
use mica_core::{Error, GeoTransform, Observation, Raster, Result};

/// Distance (projected units, metres) over which proximity reaches ~95%
const SATURATION_DISTANCE: f64 = 100_000.0;

/// Proximity index of a distance: 0 on the coast, increasing towards 1.
#[inline]
pub fn coast_proximity(distance: f64) -> f64 {
    1.0 - (-3.0 * distance / SATURATION_DISTANCE).exp()
}

fn distance_to(coastline: &MultiLineString<f64>, x: f64, y: f64) -> f64 {
    let p = Point::new(x, y);
    coastline
        .iter()
        .filter(|line| !line.0.is_empty())
        .map(|line: &LineString<f64>| Euclidean::distance(&p, line))
        .fold(f64::INFINITY, f64::min)
}

fn check_coastline(coastline: &MultiLineString<f64>) -> Result<()> {
    if coastline.0.iter().all(|line| line.0.is_empty()) {
        return Err(Error::InvalidParameter {
            name: "coastline",
            value: format!("{} lines", coastline.0.len()),
            reason: "has no vertices".into(),
        });
    }
    Ok(())
}

/// Euclidean distance from each station's projected position to the coastline
pub fn distances_to_line(points: &[Observation], coastline: &MultiLineString<f64>) -> Result<Vec<f64>> {
    check_coastline(coastline)?;
    Ok(points.iter().map(|p| distance_to(coastline, p.x, p.y)).collect())
}

/// Raster of [`coast_proximity`] at every grid node.
pub fn proximity_raster(
    coastline: &MultiLineString<f64>,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
) -> Result<Raster<f64>> {
    check_coastline(coastline)?;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let (x, y) = transform.node(col, row);
                    coast_proximity(distance_to(coastline, x, y))
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(transform);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::line_string;

    fn coast() -> MultiLineString<f64> {
        // a straight north-south coastline at x = 0
        MultiLineString::new(vec![line_string![(x: 0.0, y: -1e6), (x: 0.0, y: 1e6)]])
    }

    #[test]
    fn test_proximity_shape() {
        assert_eq!(coast_proximity(0.0), 0.0);
        assert_relative_eq!(coast_proximity(100_000.0), 1.0 - (-3.0_f64).exp(), epsilon = 1e-12);
        let samples: Vec<f64> = [0.0, 1e3, 1e4, 5e4, 1e5, 1e6].iter().map(|&d| coast_proximity(d)).collect();
        assert!(samples.windows(2).all(|w| w[0] < w[1]));
        assert!(samples.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(coast_proximity(1e7) > 0.999_999);
    }

    #[test]
    fn test_station_distances() {
        let mut inland = Observation::new("A", 2.0, 41.0, 0.0);
        inland.set_position(30_000.0, 5.0);
        let mut offshore = Observation::new("B", 2.0, 41.0, 0.0);
        offshore.set_position(-2_000.0, 0.0);
        let d = distances_to_line(&[inland, offshore], &coast()).unwrap();
        assert_relative_eq!(d[0], 30_000.0, epsilon = 1e-6);
        assert_relative_eq!(d[1], 2_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nearest_of_several_lines() {
        let coast = MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 10.0)],
            line_string![(x: 100.0, y: 0.0), (x: 100.0, y: 10.0)],
        ]);
        let mut p = Observation::new("A", 0.0, 0.0, 0.0);
        p.set_position(80.0, 5.0);
        assert_relative_eq!(distances_to_line(&[p], &coast).unwrap()[0], 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_past_the_last_vertex() {
        let coast = MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 10.0)]]);
        let mut p = Observation::new("A", 0.0, 0.0, 0.0);
        p.set_position(3.0, 14.0);
        assert_relative_eq!(distances_to_line(&[p], &coast).unwrap()[0], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_raster() {
        let gt = GeoTransform::from_bounds(0.0, 50_000.0, 10_000.0);
        let r = proximity_raster(&coast(), 5, 5, gt).unwrap();
        assert_eq!(r.get(2, 0).unwrap(), 0.0);
        assert_relative_eq!(r.get(2, 3).unwrap(), coast_proximity(30_000.0), epsilon = 1e-12);
        assert!(r.get(0, 4).unwrap() > r.get(0, 1).unwrap());
    }

    #[test]
    fn test_empty_coastline() {
        let empty = MultiLineString::<f64>::new(vec![]);
        assert!(distances_to_line(&[], &empty).is_err());
        assert!(proximity_raster(&empty, 2, 2, GeoTransform::default()).is_err());
    }
}
