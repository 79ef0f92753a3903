//! Station observations

use crate::error::{Error, Result};
use geo_types::Point;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Field name every 3-D method reads the station height from
pub const ALTITUDE: &str = "altitude";

/// A station reading.
///
/// `x`/`y` start equal to `lon`/`lat` and are replaced with projected
/// coordinates before any distance is computed. A serialized record may
/// omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ObservationRecord")]
pub struct Observation {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub x: f64,
    pub y: f64,
    /// Observed value of the estimated variable
    pub value: f64,
    /// Named auxiliary values (predictors, `altitude`)
    pub fields: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct ObservationRecord {
    id: String,
    lon: f64,
    lat: f64,
    x: Option<f64>,
    y: Option<f64>,
    value: f64,
    #[serde(default)]
    fields: BTreeMap<String, f64>,
}

impl From<ObservationRecord> for Observation {
    fn from(r: ObservationRecord) -> Self {
        Self {
            x: r.x.unwrap_or(r.lon),
            y: r.y.unwrap_or(r.lat),
            id: r.id,
            lon: r.lon,
            lat: r.lat,
            value: r.value,
            fields: r.fields,
        }
    }
}

impl Observation {
    pub fn new(id: impl Into<String>, lon: f64, lat: f64, value: f64) -> Self {
        Self {
            id: id.into(),
            lon,
            lat,
            x: lon,
            y: lat,
            value,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn field(&self, key: &str) -> Result<f64> {
        self.fields
            .get(key)
            .copied()
            .ok_or_else(|| Error::MissingField {
                point: self.id.clone(),
                key: key.to_string(),
            })
    }

    pub fn altitude(&self) -> Result<f64> {
        self.field(ALTITUDE)
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Projected position as a point
    pub fn position(&self) -> Point<f64> {
        Point::new(self.x, self.y)
    }

    /// Fail on the first field of `keys` this observation lacks
    pub fn require_fields<S: AsRef<str>>(&self, keys: &[S]) -> Result<()> {
        keys.iter().try_for_each(|k| self.field(k.as_ref()).map(|_| ()))
    }
}

/// Fail on the first id that appears twice
pub fn check_unique_ids(points: &[Observation]) -> Result<()> {
    let mut seen = HashSet::with_capacity(points.len());
    for p in points {
        if !seen.insert(p.id.as_str()) {
            return Err(Error::DuplicatePointId(p.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_starts_at_lon_lat() {
        let mut p = Observation::new("AA", 2.1, 41.4, 12.5);
        assert_eq!((p.x, p.y), (2.1, 41.4));
        p.set_position(430_000.0, 4_580_000.0);
        assert_eq!(p.position(), Point::new(430_000.0, 4_580_000.0));
        assert_eq!(p.lon, 2.1);
    }

    #[test]
    fn test_missing_field_names_point() {
        let p = Observation::new("AA", 0.0, 0.0, 1.0).with_field("dist", 3.0);
        assert_eq!(p.field("dist").unwrap(), 3.0);
        match p.altitude() {
            Err(Error::MissingField { point, key }) => {
                assert_eq!(point, "AA");
                assert_eq!(key, "altitude");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(p.require_fields(&["dist"]).is_ok());
        assert!(p.require_fields(&["dist", "hr"]).is_err());
    }

    #[test]
    fn test_duplicate_ids() {
        let pts = vec![
            Observation::new("AA", 0.0, 0.0, 1.0),
            Observation::new("BB", 1.0, 1.0, 1.0),
            Observation::new("AA", 2.0, 2.0, 1.0),
        ];
        assert!(matches!(check_unique_ids(&pts), Err(Error::DuplicatePointId(id)) if id == "AA"));
        assert!(check_unique_ids(&pts[..2]).is_ok());
    }

    #[test]
    fn test_deserialize_without_fields() {
        let p: Observation = serde_json::from_str(
            r#"{"id":"AA","lon":1.0,"lat":2.0,"x":1.0,"y":2.0,"value":3.0}"#,
        )
        .unwrap();
        assert!(p.fields.is_empty());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let p: Observation = serde_json::from_str(r#"{"id":"AA","lon":1.0,"lat":2.0,"value":3.0}"#).unwrap();
        assert_eq!(p, Observation::new("AA", 1.0, 2.0, 3.0));

        let p: Observation = serde_json::from_str(
            r#"{"id":"BB","lon":1.0,"lat":2.0,"x":400.0,"value":3.0,"fields":{"altitude":12.0}}"#,
        )
        .unwrap();
        assert_eq!((p.x, p.y), (400.0, 2.0));
        assert_eq!(p.altitude().unwrap(), 12.0);

        let back: Observation = serde_json::from_str(&serde_json::to_string(&p).unwrap()).unwrap();
        assert_eq!(back, p);
    }
}
