//! Region geometry: buffered points and GeoJSON input.
//!
//! Everything here produces plain `geo::Polygon<f64>` values in lon/lat
//! degrees (x = longitude, y = latitude), which is all the covering step
//! needs.

mod geojson;

pub use geojson::{read_geojson, read_geojson_file};

use std::fmt;
use std::str::FromStr;

use geo::{Coord, LineString, Polygon};
use thiserror::Error;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Smallest buffer radius used around a point.
///
/// Radii below this (including zero) are clamped up so a single point still
/// covers the tiles directly under it.
pub const MIN_BUFFER_RADIUS_M: f64 = 1.0;

/// Number of vertices used to approximate a buffered point.
pub const BUFFER_SEGMENTS: usize = 64;

/// Errors raised while building region geometry.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Failed to read region file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid GeoJSON geometry: {0}")]
    InvalidGeometry(String),

    #[error("GeoJSON contains no polygon or point geometry")]
    Empty,
}

/// Length unit accepted for buffer distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
}

impl DistanceUnit {
    fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1_000.0,
            DistanceUnit::Miles => 1_609.344,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
        }
    }
}

/// A buffer distance such as `10km` or `5mi`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    pub fn kilometers(value: f64) -> Self {
        Self::new(value, DistanceUnit::Kilometers)
    }

    /// Distance in metres.
    pub fn meters(&self) -> f64 {
        self.value * self.unit.meters_per_unit()
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for Distance {
    type Err = String;

    /// Parses `<number>[m|km|mi]`. A bare number is read as kilometres.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (number, unit) = if let Some(n) = s.strip_suffix("km") {
            (n, DistanceUnit::Kilometers)
        } else if let Some(n) = s.strip_suffix("mi") {
            (n, DistanceUnit::Miles)
        } else if let Some(n) = s.strip_suffix('m') {
            (n, DistanceUnit::Meters)
        } else {
            (s.as_str(), DistanceUnit::Kilometers)
        };

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid distance '{}': expected e.g. 10km, 5mi, 250m", s))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("invalid distance '{}': must be a non-negative number", s));
        }

        Ok(Self::new(value, unit))
    }
}

/// Point reached by travelling `distance_m` from (`lat`, `lon`) along
/// `bearing_rad`, on a spherical Earth. Returns `(lon, lat)` in degrees.
fn destination(lat: f64, lon: f64, bearing_rad: f64, distance_m: f64) -> (f64, f64) {
    let angular = distance_m / EARTH_RADIUS_M;
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing_rad.cos()).asin();
    let lon2 = lon1
        + (bearing_rad.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    (lon2.to_degrees(), lat2.to_degrees())
}

/// Buffers a point into a circular polygon of `radius_m` metres.
///
/// The radius is clamped to [`MIN_BUFFER_RADIUS_M`].
pub fn buffer_point(lat: f64, lon: f64, radius_m: f64) -> Polygon<f64> {
    let radius = radius_m.max(MIN_BUFFER_RADIUS_M);

    let mut ring: Vec<Coord<f64>> = (0..BUFFER_SEGMENTS)
        .map(|i| {
            let bearing = (i as f64 / BUFFER_SEGMENTS as f64) * std::f64::consts::TAU;
            let (x, y) = destination(lat, lon, bearing, radius);
            Coord { x, y }
        })
        .collect();
    ring.push(ring[0]);

    Polygon::new(LineString::from(ring), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{BoundingRect, Contains, Point};

    #[test]
    fn test_distance_parse_units() {
        assert_eq!("10km".parse::<Distance>().unwrap().meters(), 10_000.0);
        assert_eq!("250m".parse::<Distance>().unwrap().meters(), 250.0);
        assert_eq!("2".parse::<Distance>().unwrap().meters(), 2_000.0);
        assert!(("1mi".parse::<Distance>().unwrap().meters() - 1_609.344).abs() < 1e-9);
        assert!(("1.5 MI".parse::<Distance>().unwrap().meters() - 2_414.016).abs() < 1e-6);
    }

    #[test]
    fn test_distance_parse_rejects_garbage() {
        assert!("ten km".parse::<Distance>().is_err());
        assert!("-5km".parse::<Distance>().is_err());
        assert!("".parse::<Distance>().is_err());
    }

    #[test]
    fn test_distance_display() {
        assert_eq!(Distance::kilometers(10.0).to_string(), "10km");
    }

    #[test]
    fn test_buffer_point_contains_center() {
        let region = buffer_point(41.382374, 2.166612, 10_000.0);
        assert!(region.contains(&Point::new(2.166612, 41.382374)));
        assert_eq!(region.exterior().0.len(), BUFFER_SEGMENTS + 1);
    }

    #[test]
    fn test_buffer_point_extent_matches_radius() {
        let region = buffer_point(0.0, 0.0, 111_195.0);
        let rect = region.bounding_rect().unwrap();
        // One degree of latitude is ~111.195 km on the mean sphere
        assert!((rect.max().y - 1.0).abs() < 1e-3);
        assert!((rect.min().y + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_buffer_point_zero_radius_is_clamped() {
        let region = buffer_point(10.0, 10.0, 0.0);
        let rect = region.bounding_rect().unwrap();
        assert!(rect.height() > 0.0);
        assert!(region.contains(&Point::new(10.0, 10.0)));
    }
}
